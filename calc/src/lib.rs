pub mod context;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod format;
pub mod grid;
pub mod handlers;
pub mod plot;
pub mod pretty;
pub mod state;
pub mod substitute;
pub mod table;
pub mod tags;
pub mod units;
pub mod value;

pub use context::{Context, Folders};
pub use environment::Environment;
pub use error::{CalcError, EvalError};
pub use executor::{CalcFragment, convert_string};
pub use format::FormatSettings;
pub use plot::{ChartBackend, PlotSpec, RecordingBackend};
pub use state::RunningState;
pub use value::Value;
