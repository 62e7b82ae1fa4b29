//! Plain-text charts for `trends summary --plot`.

pub mod ascii;

pub use ascii::{Metric, render_bar_chart};
