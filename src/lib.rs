pub mod classifier;
pub mod config;
pub mod corpus;
pub mod error;
pub mod evaluation;
pub mod history_export;
pub mod html_table;
pub mod http_client;
pub mod matchup;
pub mod merge;
pub mod normalize;
pub mod outcome;
pub mod pipeline;
pub mod raw_table;
pub mod results_store;
pub mod scaler;
pub mod schema;
pub mod service;
pub mod source;
pub mod synthetic;
pub mod team_table;
pub mod view;

pub use error::{PipelineError, PredictError};
