pub mod accuracy;
pub mod breakout;
pub mod candle;
pub mod config;
pub mod data;
pub mod error;
pub mod moves;
pub mod output;
pub mod pipeline;
pub mod records;
pub mod rules;
pub mod series;
pub mod session;
pub mod sweep;
pub mod window;
