use voxlead_db::{create_pool, run_migrations, DbRuntimeSettings};

#[test]
fn schema_is_shared_across_pooled_connections() {
    let file = tempfile::NamedTempFile::new().expect("failed to create temp file");
    let path = file.path().to_str().expect("utf-8 path");
    let pool = create_pool(path, DbRuntimeSettings::default()).expect("failed to create pool");

    {
        let conn = pool.get().expect("failed to get connection");
        run_migrations(&conn).expect("failed to run migrations");
        conn.execute(
            "INSERT INTO number_mappings (phone_number, tenant_id, agent_id)
             VALUES ('+33100000000', 'tenant-1', 'agent-1')",
            [],
        )
        .expect("failed to insert mapping");
    }

    let a = pool.get().expect("first connection");
    let b = pool.get().expect("second connection");
    let tenant: String = b
        .query_row(
            "SELECT tenant_id FROM number_mappings WHERE phone_number = '+33100000000'",
            [],
            |row| row.get(0),
        )
        .expect("mapping visible from another connection");
    assert_eq!(tenant, "tenant-1");

    let applied = run_migrations(&a).expect("rerun");
    assert_eq!(applied, 0);
}

#[test]
fn deleting_a_call_removes_its_transcript() {
    let pool = create_pool(":memory:", DbRuntimeSettings { busy_timeout_ms: 1_000, pool_max_size: 1 })
        .expect("failed to create pool");
    let conn = pool.get().expect("failed to get connection");
    run_migrations(&conn).expect("failed to run migrations");

    conn.execute_batch(
        "INSERT INTO calls (id, tenant_id, agent_id, direction, from_number, to_number, status)
         VALUES ('c1', 't1', 'a1', 'inbound', '+331', '+332', 'in-progress');
         INSERT INTO call_utterances (call_id, seq, speaker, text) VALUES ('c1', 1, 'caller', 'hi');
         DELETE FROM calls WHERE id = 'c1';",
    )
    .expect("batch should succeed");

    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM call_utterances", [], |row| row.get(0))
        .expect("count");
    assert_eq!(remaining, 0);
}
