use thiserror::Error;

/// JSON-RPC code for a failed pre-flight simulation
pub const SIMULATION_FAILED_CODE: i64 = -32002;

const SIMULATION_FAILED_MESSAGE: &str = "Transaction simulation failed";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum NetworkError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Transaction simulation failed: {0}")]
    SimulationFailed(String),

    #[error("block height exceeded before {signature} confirmed")]
    BlockHeightExceeded { signature: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("encoding error: {0}")]
    Encoding(String),
}

impl NetworkError {
    /// Classify a JSON-RPC error object
    pub fn from_rpc(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        if code == SIMULATION_FAILED_CODE || message.contains(SIMULATION_FAILED_MESSAGE) {
            NetworkError::SimulationFailed(message)
        } else {
            NetworkError::Rpc { code, message }
        }
    }

    /// Pre-flight rejection: the transaction never reached the chain
    pub fn is_simulation_failure(&self) -> bool {
        matches!(self, NetworkError::SimulationFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulation_failure_by_code() {
        let err = NetworkError::from_rpc(-32002, "custom program error: 0x1771");
        assert!(err.is_simulation_failure());
    }

    #[test]
    fn test_simulation_failure_by_message() {
        let err = NetworkError::from_rpc(
            -32603,
            "Transaction simulation failed: Blockhash not found",
        );
        assert!(err.is_simulation_failure());
    }

    #[test]
    fn test_other_rpc_errors_are_not_simulation() {
        let err = NetworkError::from_rpc(-32005, "Node is behind");
        assert!(!err.is_simulation_failure());
        assert_eq!(
            err,
            NetworkError::Rpc {
                code: -32005,
                message: "Node is behind".to_string()
            }
        );
    }
}
