//! # Transaction Kinds
//!
//! Query, deploy and transfer transactions end to end, plus the encoded output.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::*;
    use vm_host_state::prelude::*;

    fn token() -> Address {
        Address::from_name("token")
    }

    fn token_executor() -> ScriptedExecutor {
        let mut executor = ScriptedExecutor::new();
        executor.register(
            "token-code",
            ScriptedContract::new()
                .with_function("init", |host, _| {
                    host.storage_store(b"supply", b"1000")?;
                    host.write_log("Deployed", Vec::new(), "")
                })
                .with_function("supply", |host, _| {
                    let supply = host.storage_load(b"supply")?;
                    host.finish(supply)
                })
                .with_function("mint", |host, _| {
                    host.storage_store(b"supply", b"2000")?;
                    host.write_log("Minted", vec![Bytes::from("user")], "1000")?;
                    host.finish("minted")
                }),
        );
        executor
    }

    // =========================================================================
    // QUERY
    // =========================================================================

    #[test]
    fn test_query_reads_without_effects() {
        let world = world_with_user(0);
        install(&world, token(), "token-code", CodeMetadata::default(), 0);
        world.set_storage(token(), b"supply", b"1000");

        let service = service(world, token_executor(), HostConfig::default());

        let output = execute(&service, &TransactionInput::query(token(), "supply", 100_000));
        assert!(output.is_success(), "{}", output.return_message);
        assert_eq!(output.finish_strings(), vec!["1000"]);

        // writes in a query are skipped, logs are still recorded
        let output = execute(&service, &TransactionInput::query(token(), "mint", 100_000));
        assert!(output.is_success(), "{}", output.return_message);
        assert!(output.output_accounts.is_empty());
        assert_eq!(output.logs.len(), 1);
        assert_eq!(output.finish_strings(), vec!["minted"]);
    }

    // =========================================================================
    // DEPLOY
    // =========================================================================

    #[test]
    fn test_deploy_records_code_and_runs_init() {
        let world = world_with_user(500);
        let expected = world.new_address(&user(), 7).unwrap();

        let service = service(world, token_executor(), HostConfig::default());
        let tx = TransactionInput::deploy(user(), 7, Bytes::from("token-code"), payable(), 100_000)
            .with_value(U256::from(50));
        let output = execute(&service, &tx);

        assert!(output.is_success(), "{}", output.return_message);
        let account = output.account(&expected).unwrap();
        assert_eq!(account.code, Some(Bytes::from("token-code")));
        assert_eq!(account.code_metadata, Some(payable()));
        assert_eq!(account.balance_delta, BalanceDelta::from_i64(50));
        assert_eq!(
            account.storage_updates[b"supply".as_slice()].value,
            Bytes::from("1000")
        );
        assert_eq!(
            output.account(&user()).unwrap().balance_delta,
            BalanceDelta::from_i64(-50)
        );
        assert_eq!(output.logs[0].address, expected);
    }

    #[test]
    fn test_deploy_without_init_function() {
        let mut executor = ScriptedExecutor::new();
        executor.register(
            "plain-code",
            ScriptedContract::new().with_function("noop", |_, _| Ok(())),
        );
        let world = world_with_user(0);
        let expected = world.new_address(&user(), 0).unwrap();

        let service = service(world, executor, HostConfig::default());
        let tx = TransactionInput::deploy(
            user(),
            0,
            Bytes::from("plain-code"),
            CodeMetadata::default(),
            100_000,
        );
        let output = execute(&service, &tx);

        assert!(output.is_success(), "{}", output.return_message);
        assert!(output.finish_data.is_empty());
        assert_eq!(
            output.account(&expected).unwrap().code,
            Some(Bytes::from("plain-code"))
        );
    }

    #[test]
    fn test_deploy_with_failing_init_leaves_nothing() {
        let mut executor = ScriptedExecutor::new();
        executor.register(
            "bad-code",
            ScriptedContract::new()
                .with_function("init", |_, _| Err(VmError::UserError("bad init".into()))),
        );

        let service = service(world_with_user(100), executor, HostConfig::default());
        let tx = TransactionInput::deploy(
            user(),
            0,
            Bytes::from("bad-code"),
            CodeMetadata::default(),
            100_000,
        )
        .with_value(U256::from(10));
        let output = execute(&service, &tx);

        assert_eq!(output.return_code, ReturnCode::UserError);
        assert_eq!(output.return_message, "user error: bad init");
        assert!(output.output_accounts.is_empty());
    }

    // =========================================================================
    // TRANSFER
    // =========================================================================

    #[test]
    fn test_transfer_moves_value() {
        let bob = Address::from_name("bob");
        let service = service(world_with_user(100), ScriptedExecutor::new(), HostConfig::default());

        let output = execute(&service, &TransactionInput::transfer(user(), bob, U256::from(40)));
        assert!(output.is_success(), "{}", output.return_message);
        assert_eq!(
            output.account(&user()).unwrap().balance_delta,
            BalanceDelta::from_i64(-40)
        );
        assert_eq!(
            output.account(&bob).unwrap().balance_delta,
            BalanceDelta::from_i64(40)
        );
    }

    #[test]
    fn test_transfer_out_of_funds() {
        let bob = Address::from_name("bob");
        let service = service(world_with_user(10), ScriptedExecutor::new(), HostConfig::default());

        let output = execute(&service, &TransactionInput::transfer(user(), bob, U256::from(1_000)));
        assert_eq!(output.return_code, ReturnCode::OutOfFunds);
        assert!(output.output_accounts.is_empty());
    }

    #[test]
    fn test_transfer_into_non_payable_contract() {
        let world = world_with_user(100);
        install(&world, token(), "token-code", CodeMetadata::default(), 0);
        let service = service(world, token_executor(), HostConfig::default());

        let output = execute(&service, &TransactionInput::transfer(user(), token(), U256::from(1)));
        assert_eq!(output.return_code, ReturnCode::UserError);
    }

    // =========================================================================
    // FAILURES AND ENCODING
    // =========================================================================

    #[test]
    fn test_unknown_contract_and_function() {
        let world = world_with_user(0);
        install(&world, token(), "token-code", CodeMetadata::default(), 0);
        let service = service(world, token_executor(), HostConfig::default());

        let output = execute(&service, &TransactionInput::call(user(), token(), "burn", 100_000));
        assert_eq!(output.return_code, ReturnCode::FunctionNotFound);

        let nobody = Address::from_name("nobody");
        let output = execute(&service, &TransactionInput::call(user(), nobody, "supply", 100_000));
        assert_eq!(output.return_code, ReturnCode::ContractNotFound);
    }

    #[test]
    fn test_unavailable_lookup_fails_cleanly() {
        let world = world_with_user(0);
        install(&world, token(), "token-code", CodeMetadata::default(), 0);
        world.set_unavailable(true);
        let service = service(world, token_executor(), HostConfig::default());

        let output = execute(&service, &TransactionInput::call(user(), token(), "mint", 100_000));
        assert_eq!(output.return_code, ReturnCode::ExecutionFailed);
        assert_eq!(output.gas_remaining, 0);

        service.lookup().set_unavailable(false);
        let output = execute(&service, &TransactionInput::call(user(), token(), "mint", 100_000));
        assert!(output.is_success(), "{}", output.return_message);
    }

    #[test]
    fn test_output_encoding_and_log_digest() {
        let world = world_with_user(0);
        install(&world, token(), "token-code", CodeMetadata::default(), 0);
        let service = service(world, token_executor(), HostConfig::default());
        let tx = TransactionInput::call(user(), token(), "mint", 100_000);

        let first = execute(&service, &tx);
        let second = execute(&service, &tx);
        assert_eq!(first.logs_hash(), second.logs_hash());
        assert_ne!(first.logs_hash(), TransactionOutput::default().logs_hash());

        let json: serde_json::Value = serde_json::from_str(&first.to_json().unwrap()).unwrap();
        let token_key = format!("0x{}", hex::encode(token().as_bytes()));
        let supply_key = format!("0x{}", hex::encode(b"supply"));
        assert_eq!(
            json["output_accounts"][&token_key]["storage_updates"][&supply_key]["value"],
            format!("0x{}", hex::encode(b"2000"))
        );

        let decoded: TransactionOutput = serde_json::from_str(&first.to_json().unwrap()).unwrap();
        assert_eq!(decoded, first);
    }

    #[test]
    fn test_service_stats_over_batch() {
        let world = world_with_user(0);
        install(&world, token(), "token-code", CodeMetadata::default(), 0);
        let service = service(world, token_executor(), HostConfig::default());

        let txs = vec![
            TransactionInput::call(user(), token(), "mint", 100_000),
            TransactionInput::call(user(), token(), "burn", 100_000),
            TransactionInput::query(token(), "supply", 100_000).with_value(U256::from(1)),
        ];
        let reports = service.execute_batch(&txs);
        assert!(reports[0].is_ok());
        assert!(reports[1].is_ok());
        assert!(matches!(reports[2], Err(ServiceError::InvalidTransaction(_))));

        let stats = service.stats();
        assert_eq!(stats.transactions_executed, 2);
        assert_eq!(stats.successful_executions, 1);
        assert_eq!(stats.failed_executions, 1);
        assert_eq!(stats.rejected_transactions, 1);
        assert_eq!(stats.invariant_violations, 0);
    }
}
