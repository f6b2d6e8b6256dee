//! # Storage Flows
//!
//! Staged writes seen through whole transactions: status classification,
//! per-byte charges and refunds, key protection and foreign reads.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::*;
    use vm_host_state::prelude::*;

    const STORE: u64 = 50;
    const PERSIST: u64 = 10;
    const RELEASE: u64 = 5;

    fn contract() -> Address {
        Address::from_name("storage-contract")
    }

    fn byte_priced() -> HostConfig {
        HostConfig::default().with_gas_schedule(GasSchedule::storage_only(STORE, PERSIST, RELEASE))
    }

    fn run(function: &str, world: InMemoryWorld, executor: ScriptedExecutor) -> TransactionOutput {
        let service = service(world, executor, byte_priced());
        execute(
            &service,
            &TransactionInput::call(user(), contract(), function, 100_000),
        )
    }

    // =========================================================================
    // STATUS AND GAS
    // =========================================================================

    #[test]
    fn test_add_modify_delete_sequence() {
        let world = world_with_user(0);
        install(&world, contract(), "store-code", CodeMetadata::default(), 0);

        let mut executor = ScriptedExecutor::new();
        executor.register(
            "store-code",
            ScriptedContract::new().with_function("sequence", |host, _| {
                let before = host.gas_left();
                assert_eq!(host.storage_store(b"key", b"value")?, StorageStatus::Added);
                assert_eq!(before - host.gas_left(), STORE * 5);

                let before = host.gas_left();
                assert_eq!(host.storage_store(b"key", b"newValue")?, StorageStatus::Modified);
                assert_eq!(before - host.gas_left(), STORE * 3 + PERSIST * 5);

                let before = host.gas_left();
                assert_eq!(host.storage_store(b"key", b"")?, StorageStatus::Deleted);
                assert_eq!(before - host.gas_left(), 0);

                assert!(host.storage_load(b"key")?.is_empty());
                Ok(())
            }),
        );

        let output = run("sequence", world, executor);
        assert!(output.is_success(), "{}", output.return_message);
        assert_eq!(output.gas_remaining, 100_000 - STORE * 5 - (STORE * 3 + PERSIST * 5));
        assert_eq!(output.gas_refund, RELEASE * 8);

        let updates = &output.account(&contract()).unwrap().storage_updates;
        assert_eq!(updates.len(), 1);
        assert!(updates[b"key".as_slice()].value.is_empty());
    }

    #[test]
    fn test_charge_against_committed_value() {
        let world = world_with_user(0);
        install(&world, contract(), "store-code", CodeMetadata::default(), 0);
        world.set_storage(contract(), b"key", b"value");

        let mut executor = ScriptedExecutor::new();
        executor.register(
            "store-code",
            ScriptedContract::new().with_function("shrink", |host, _| {
                assert_eq!(host.storage_load(b"key")?, Bytes::from("value"));
                assert_eq!(host.storage_store(b"key", b"val")?, StorageStatus::Modified);
                assert_eq!(host.storage_store(b"key", b"val")?, StorageStatus::Unchanged);
                Ok(())
            }),
        );

        let output = run("shrink", world, executor);
        assert!(output.is_success(), "{}", output.return_message);
        assert_eq!(output.gas_remaining, 100_000 - PERSIST * 3);
        assert_eq!(output.gas_refund, RELEASE * 2);
        let updates = &output.account(&contract()).unwrap().storage_updates;
        assert_eq!(updates[b"key".as_slice()].value, Bytes::from("val"));
    }

    #[test]
    fn test_out_of_gas_write_fails_transaction() {
        let world = world_with_user(0);
        install(&world, contract(), "store-code", CodeMetadata::default(), 0);

        let mut executor = ScriptedExecutor::new();
        executor.register(
            "store-code",
            ScriptedContract::new().with_function("big", |host, _| {
                host.storage_store(b"key", &[7u8; 64])?;
                Ok(())
            }),
        );

        let service = service(world, executor, byte_priced());
        let output = execute(
            &service,
            &TransactionInput::call(user(), contract(), "big", STORE * 63),
        );
        assert_eq!(output.return_code, ReturnCode::OutOfGas);
        assert!(output.output_accounts.is_empty());
        assert_eq!(output.gas_remaining, 0);
    }

    // =========================================================================
    // KEY PROTECTION
    // =========================================================================

    #[test]
    fn test_reserved_and_protected_keys_rejected() {
        let world = world_with_user(0);
        install(&world, contract(), "store-code", CodeMetadata::default(), 0);

        let mut executor = ScriptedExecutor::new();
        executor.register(
            "store-code",
            ScriptedContract::new().with_function("probe", |host, _| {
                assert_eq!(
                    host.storage_store(b"RESERVEDnonce", b"1"),
                    Err(VmError::Storage(StorageError::ReservedKey))
                );
                assert_eq!(
                    host.storage_store(b"PROTECTEDowner", b"me"),
                    Err(VmError::Storage(StorageError::ProtectedKey))
                );
                host.storage_store(b"ok", b"yes")?;
                Ok(())
            }),
        );

        let output = run("probe", world, executor);
        assert!(output.is_success(), "{}", output.return_message);
        let updates = &output.account(&contract()).unwrap().storage_updates;
        assert_eq!(updates.keys().cloned().collect::<Vec<_>>(), vec![Bytes::from("ok")]);
    }

    #[test]
    fn test_custom_prefixes() {
        let world = world_with_user(0);
        install(&world, contract(), "store-code", CodeMetadata::default(), 0);

        let mut executor = ScriptedExecutor::new();
        executor.register(
            "store-code",
            ScriptedContract::new().with_function("probe", |host, _| {
                // default prefixes are plain keys under this config
                host.storage_store(b"RESERVEDkey", b"1")?;
                assert_eq!(
                    host.storage_store(b"sys:key", b"1"),
                    Err(VmError::Storage(StorageError::ReservedKey))
                );
                Ok(())
            }),
        );

        let config = byte_priced()
            .with_reserved_prefix(b"sys:")
            .with_protected_prefix(b"prot:");
        let service = service(world, executor, config);
        let output = execute(
            &service,
            &TransactionInput::call(user(), contract(), "probe", 100_000),
        );
        assert!(output.is_success(), "{}", output.return_message);
    }

    // =========================================================================
    // FOREIGN READS
    // =========================================================================

    #[test]
    fn test_foreign_storage_requires_readable_flag() {
        let open = Address::from_name("open");
        let closed = Address::from_name("closed");

        let world = world_with_user(0);
        install(&world, contract(), "store-code", CodeMetadata::default(), 0);
        install(&world, open, "open-code", readable(), 0);
        install(&world, closed, "closed-code", CodeMetadata::default(), 0);
        world.set_storage(open, b"price", b"42");
        world.set_storage(closed, b"price", b"13");

        let mut executor = ScriptedExecutor::new();
        executor.register(
            "store-code",
            ScriptedContract::new().with_function("peek", move |host, _| {
                assert_eq!(
                    host.storage_load_from_address(&open, b"price")?,
                    Some(Bytes::from("42"))
                );
                assert_eq!(host.storage_load_from_address(&closed, b"price")?, None);
                Ok(())
            }),
        );

        let output = run("peek", world, executor);
        assert!(output.is_success(), "{}", output.return_message);
        assert!(output.output_accounts.is_empty());
    }
}
