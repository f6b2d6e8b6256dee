//! # Nested Calls
//!
//! Same-context and different-context calls: what survives a child's success
//! or failure, how the parent pays for it, recursion order and the depth limit.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::*;
    use vm_host_state::prelude::*;

    fn parent() -> Address {
        Address::from_name("parent")
    }

    fn child() -> Address {
        Address::from_name("child")
    }

    /// World with a funded payable parent and an empty payable child.
    fn world() -> InMemoryWorld {
        let world = world_with_user(1_000);
        install(&world, parent(), "parent-code", payable(), 100);
        install(&world, child(), "child-code", payable(), 0);
        world
    }

    fn call(function: &str) -> TransactionInput {
        TransactionInput::call(user(), parent(), function, 1_000_000)
    }

    // =========================================================================
    // SAME CONTEXT
    // =========================================================================

    #[test]
    fn test_failed_same_context_child_leaves_parent_storage() {
        let mut executor = ScriptedExecutor::new();
        executor.register(
            "parent-code",
            ScriptedContract::new().with_function("run", |host, _| {
                host.storage_store(b"parentKey", b"p")?;
                let outcome =
                    host.execute_on_same_context(NestedCall::new(child(), "fail", 5_000))?;
                match outcome {
                    CallOutcome::Failed {
                        return_code,
                        gas_charged,
                        ..
                    } => {
                        assert_eq!(return_code, ReturnCode::UserError);
                        assert_eq!(gas_charged, 5_000);
                    }
                    CallOutcome::Succeeded { .. } => panic!("child should fail"),
                }
                assert_eq!(host.storage_load(b"childKey")?, Bytes::new());
                Ok(())
            }),
        );
        executor.register(
            "child-code",
            ScriptedContract::new().with_function("fail", |host, _| {
                host.storage_store(b"childKey", b"c")?;
                host.finish("lost")?;
                Err(VmError::UserError("child refuses".into()))
            }),
        );

        let service = service(world(), executor, HostConfig::default());
        let output = execute(&service, &call("run"));

        assert!(output.is_success(), "{}", output.return_message);
        let updates = &output.account(&parent()).unwrap().storage_updates;
        assert_eq!(updates.len(), 1);
        assert!(updates.contains_key(b"parentKey".as_slice()));
        assert!(output.account(&child()).is_none());
        assert_eq!(output.finish_strings(), vec!["fail"]);
    }

    #[test]
    fn test_out_of_gas_child_forfeits_its_gas() {
        let mut executor = ScriptedExecutor::new();
        executor.register(
            "parent-code",
            ScriptedContract::new().with_function("run", |host, _| {
                host.storage_store(b"parentKey", b"p")?;
                let before = host.gas_left();
                let outcome =
                    host.execute_on_same_context(NestedCall::new(child(), "burn", 7_000))?;
                assert_eq!(
                    outcome,
                    CallOutcome::Failed {
                        return_code: ReturnCode::OutOfGas,
                        message: "out of gas".into(),
                        gas_charged: 7_000,
                    }
                );
                assert_eq!(before - host.gas_left(), 7_000);
                assert_eq!(host.storage_load(b"parentKey")?, Bytes::from("p"));
                assert!(host.storage_load(b"childKey")?.is_empty());
                host.finish("after")
            }),
        );
        executor.register(
            "child-code",
            ScriptedContract::new().with_function("burn", |host, _| {
                host.storage_store(b"childKey", b"c")?;
                let left = host.gas_left();
                host.use_gas(left)?;
                host.use_gas(1)
            }),
        );

        let config = HostConfig::default().with_gas_schedule(GasSchedule::uniform(0));
        let service = service(world(), executor, config);
        let output = execute(&service, &call("run"));

        assert!(output.is_success(), "{}", output.return_message);
        assert_eq!(output.finish_strings(), vec!["fail", "after"]);
        assert_eq!(output.gas_remaining, 1_000_000 - 7_000);
        let updates = &output.account(&parent()).unwrap().storage_updates;
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[b"parentKey".as_slice()].value, Bytes::from("p"));
    }

    // =========================================================================
    // DESTINATION CONTEXT
    // =========================================================================

    #[test]
    fn test_dest_context_child_gets_own_account() {
        let mut executor = ScriptedExecutor::new();
        executor.register(
            "parent-code",
            ScriptedContract::new().with_function("run", |host, _| {
                let outcome = host.execute_on_dest_context(
                    NestedCall::new(child(), "work", 20_000).with_value(U256::from(10)),
                )?;
                assert!(outcome.is_success());
                assert_eq!(host.address(), parent());
                Ok(())
            }),
        );
        executor.register(
            "child-code",
            ScriptedContract::new().with_function("work", |host, input| {
                assert_eq!(host.address(), child());
                assert_eq!(input.caller, parent());
                assert_eq!(input.value, U256::from(10));
                assert_eq!(host.output().effective_balance(&child())?, U256::from(10));
                host.storage_store(b"childKey", b"c")?;
                host.write_log("Worked", vec![Bytes::from("topic")], "payload")?;
                host.finish("child-done")
            }),
        );

        let service = service(world(), executor, HostConfig::default());
        let output = execute(&service, &call("run"));

        assert!(output.is_success(), "{}", output.return_message);
        let parent_account = output.account(&parent()).unwrap();
        assert_eq!(parent_account.balance_delta, BalanceDelta::from_i64(-10));
        assert!(parent_account.storage_updates.is_empty());

        let child_account = output.account(&child()).unwrap();
        assert_eq!(child_account.balance_delta, BalanceDelta::from_i64(10));
        assert_eq!(
            child_account.storage_updates[b"childKey".as_slice()].value,
            Bytes::from("c")
        );

        assert_eq!(output.finish_strings(), vec!["child-done", "succ"]);
        assert_eq!(output.logs.len(), 1);
        assert_eq!(output.logs[0].address, child());
    }

    #[test]
    fn test_failed_dest_context_child_rolls_back_everything() {
        let mut executor = ScriptedExecutor::new();
        executor.register(
            "parent-code",
            ScriptedContract::new().with_function("run", |host, _| {
                let outcome = host.execute_on_dest_context(
                    NestedCall::new(child(), "work", 20_000).with_value(U256::from(10)),
                )?;
                let CallOutcome::Failed { gas_charged, .. } = outcome else {
                    panic!("child should fail");
                };
                assert_eq!(gas_charged, 2_000);
                Ok(())
            }),
        );
        executor.register(
            "child-code",
            ScriptedContract::new().with_function("work", |host, _| {
                host.storage_store(b"childKey", b"c")?;
                host.write_log("Worked", Vec::new(), "payload")?;
                Err(VmError::UserError("changed my mind".into()))
            }),
        );

        let config = HostConfig::default().with_dest_context_failure_penalty(2_000);
        let service = service(world(), executor, config);
        let output = execute(&service, &call("run"));

        assert!(output.is_success(), "{}", output.return_message);
        assert!(output.output_accounts.is_empty());
        assert!(output.logs.is_empty());
        assert_eq!(output.finish_strings(), vec!["fail"]);
    }

    #[test]
    fn test_child_gas_capped_by_parent() {
        let mut executor = ScriptedExecutor::new();
        executor.register(
            "parent-code",
            ScriptedContract::new().with_function("run", |host, _| {
                host.execute_on_dest_context(NestedCall::new(child(), "measure", u64::MAX))?;
                Ok(())
            }),
        );
        executor.register(
            "child-code",
            ScriptedContract::new().with_function("measure", |host, input| {
                assert_eq!(input.gas_provided, 49_000);
                assert_eq!(host.gas_left(), 49_000);
                assert_eq!(input.depth, 1);
                Ok(())
            }),
        );

        let schedule = GasSchedule {
            execute_on_dest_context: 1_000,
            ..GasSchedule::uniform(0)
        };
        let service = service(world(), executor, HostConfig::default().with_gas_schedule(schedule));
        let output = execute(&service, &TransactionInput::call(user(), parent(), "run", 50_000));
        assert!(output.is_success(), "{}", output.return_message);
        assert_eq!(output.gas_remaining, 49_000);
    }

    #[test]
    fn test_value_into_non_payable_contract_fails_child() {
        let world = world();
        install(&world, child(), "child-code", CodeMetadata::default(), 0);

        let mut executor = ScriptedExecutor::new();
        executor.register(
            "parent-code",
            ScriptedContract::new().with_function("run", |host, _| {
                let outcome = host.execute_on_dest_context(
                    NestedCall::new(child(), "work", 5_000).with_value(U256::from(1)),
                )?;
                assert!(!outcome.is_success());
                Ok(())
            }),
        );
        executor.register(
            "child-code",
            ScriptedContract::new().with_function("work", |_, _| Ok(())),
        );

        let service = service(world, executor, HostConfig::default());
        let output = execute(&service, &call("run"));
        assert!(output.is_success(), "{}", output.return_message);
        assert!(output.account(&child()).is_none());
        assert_eq!(output.finish_strings(), vec!["fail"]);
    }

    // =========================================================================
    // RECURSION AND DEPTH
    // =========================================================================

    fn counting_contract(mode: CallMode, prefix: &'static str, next: Address) -> ScriptedContract {
        ScriptedContract::new().with_function("count", move |host, input| {
            let n = counter_arg(input);
            host.finish(format!("{prefix}{n}"))?;
            if n > 0 {
                let call = NestedCall::new(next, "count", u64::MAX).with_arguments(counter(n - 1));
                let outcome = match mode {
                    CallMode::SameContext => host.execute_on_same_context(call)?,
                    CallMode::DestinationContext => host.execute_on_dest_context(call)?,
                };
                assert!(outcome.is_success());
            }
            Ok(())
        })
    }

    #[test]
    fn test_direct_recursion_finish_order() {
        let mut executor = ScriptedExecutor::new();
        executor.register(
            "parent-code",
            counting_contract(CallMode::SameContext, "", parent()),
        );

        let service = service(world(), executor, HostConfig::default());
        let tx = call("count").with_arguments(counter(3));
        let output = execute(&service, &tx);

        assert!(output.is_success(), "{}", output.return_message);
        assert_eq!(
            output.finish_strings(),
            vec!["3", "2", "1", "0", "succ", "succ", "succ"]
        );
    }

    #[test]
    fn test_mutual_recursion_finish_order() {
        let mut executor = ScriptedExecutor::new();
        executor.register(
            "parent-code",
            counting_contract(CallMode::DestinationContext, "A", child()),
        );
        executor.register(
            "child-code",
            counting_contract(CallMode::DestinationContext, "B", parent()),
        );

        let service = service(world(), executor, HostConfig::default());
        let tx = call("count").with_arguments(counter(3));
        let output = execute(&service, &tx);

        assert!(output.is_success(), "{}", output.return_message);
        assert_eq!(
            output.finish_strings(),
            vec!["A3", "B2", "A1", "B0", "succ", "succ", "succ"]
        );
    }

    #[test]
    fn test_recursion_up_to_max_depth_succeeds() {
        let mut executor = ScriptedExecutor::new();
        executor.register(
            "parent-code",
            counting_contract(CallMode::SameContext, "", parent()),
        );

        let config = HostConfig::default().with_max_call_depth(3);
        let service = service(world(), executor, config);

        let output = execute(&service, &call("count").with_arguments(counter(3)));
        assert!(output.is_success(), "{}", output.return_message);

        let output = execute(&service, &call("count").with_arguments(counter(4)));
        assert_eq!(output.return_code, ReturnCode::CallStackOverflow);
        assert!(output.finish_data.is_empty());
    }

    #[test]
    fn test_depth_overflow_discards_all_effects() {
        let mut executor = ScriptedExecutor::new();
        executor.register(
            "parent-code",
            ScriptedContract::new().with_function("dive", |host, _| {
                let depth = host.depth().to_string();
                host.storage_store(b"depth", depth.as_bytes())?;
                host.transfer_value(user(), U256::from(1), b"")?;
                match host.execute_on_dest_context(NestedCall::new(parent(), "dive", u64::MAX)) {
                    Err(err) => {
                        assert!(err.is_fatal());
                        Err(err)
                    }
                    Ok(_) => Ok(()),
                }
            }),
        );

        let config = HostConfig::default().with_max_call_depth(5);
        let service = service(world(), executor, config);
        let output = execute(&service, &call("dive"));

        assert_eq!(output.return_code, ReturnCode::CallStackOverflow);
        assert!(output.output_accounts.is_empty());
        assert!(output.logs.is_empty());
        assert_eq!(output.gas_remaining, 0);
        assert_eq!(service.stats().failed_executions, 1);
    }
}
