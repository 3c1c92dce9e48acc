//! Builtin tool units

mod calculator;
mod data_converter;
mod echo;
mod http_client;
mod text_summary;
mod web_scraper;

pub use calculator::{CalcMode, CalculatorTool, CALCULATOR};
pub use data_converter::{DataConverterTool, DataFormat, DATA_CONVERTER};
pub use echo::{EchoTool, ECHO};
pub use http_client::{HttpClientTool, HTTP_CLIENT};
pub use text_summary::{TextSummaryTool, TEXT_SUMMARY};
pub use web_scraper::{ExtractType, WebScraperTool, WEB_SCRAPER};
