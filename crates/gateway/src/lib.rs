pub mod error;
pub mod fees;
pub mod jupiter;
pub mod mock;
pub mod traits;

pub use error::GatewayError;
pub use fees::{FeeSchedule, FeeSplit};
pub use jupiter::JupiterClient;
pub use mock::{MockGateway, MockQuote};
pub use traits::{Quote, QuoteGateway, SwapTransaction};
