// Railway NetDiag Infrastructure - HTTP Adapter
// Implements: HttpProber

pub mod reqwest_prober;

pub use reqwest_prober::ReqwestProber;
