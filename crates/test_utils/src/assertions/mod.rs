// Path: crates/test_utils/src/assertions/mod.rs
//! Assertion macros for transaction and callback results.

/// Assert that a result is `Ok` and unwrap it.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(err) => panic!("expected Ok, got Err: {:?}", err),
        }
    };
    ($expr:expr, $($arg:tt)+) => {
        match $expr {
            Ok(val) => val,
            Err(err) => panic!("expected Ok, got Err: {:?} ({})", err, format!($($arg)+)),
        }
    };
}

/// Assert that a `CheckTxResponse` or `ExecTxResult` carries the given
/// [`TxCode`](strata_types::error::TxCode).
#[macro_export]
macro_rules! assert_tx_code {
    ($result:expr, $code:expr) => {{
        let result = &$result;
        assert_eq!(
            result.code,
            $code.as_u32(),
            "expected {:?}, got code {} ({})",
            $code,
            result.code,
            result.log
        );
    }};
}

/// Assert that every transaction result in a block succeeded.
#[macro_export]
macro_rules! assert_block_ok {
    ($resp:expr) => {{
        for (i, r) in $resp.tx_results.iter().enumerate() {
            assert_eq!(r.code, 0, "tx {} failed: {}", i, r.log);
        }
    }};
}

#[cfg(test)]
mod tests {
    use strata_types::app::{CheckTxResponse, ExecTxResult, FinalizeBlockResponse};
    use strata_types::error::TxCode;

    fn result(code: TxCode) -> ExecTxResult {
        ExecTxResult {
            code: code.as_u32(),
            log: String::new(),
            gas_used: 0,
            events: vec![],
        }
    }

    #[test]
    fn macros_accept_matching_results() {
        let value: Result<u8, String> = Ok(3);
        assert_eq!(assert_ok!(value), 3);
        assert_tx_code!(CheckTxResponse::reject(TxCode::InvalidNonce, "gap"), TxCode::InvalidNonce);
        assert_tx_code!(CheckTxResponse::ok(), TxCode::Ok);
        assert_block_ok!(FinalizeBlockResponse {
            tx_results: vec![result(TxCode::Ok)],
            validator_updates: vec![],
            app_hash: vec![],
        });
    }

    #[test]
    #[should_panic(expected = "tx 1 failed")]
    fn failed_block_panics() {
        assert_block_ok!(FinalizeBlockResponse {
            tx_results: vec![result(TxCode::Ok), result(TxCode::InvalidAmount)],
            validator_updates: vec![],
            app_hash: vec![],
        });
    }
}
