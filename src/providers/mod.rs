pub mod llm;
pub mod util;
pub mod yahoo_fx;

pub use llm::LlmRateProvider;
pub use yahoo_fx::YahooFxProvider;
