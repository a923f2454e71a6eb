pub mod error;
pub mod executor;
pub mod method;
pub mod request;
pub mod transport;

pub use error::{ExecutorError, TransportError};
pub use executor::{RequestExecutor, RetryPolicy};
pub use method::HttpMethod;
pub use request::{ApiRequest, ApiResponse};
pub use transport::{ReqwestTransport, Transport};
