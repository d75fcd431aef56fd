//! Number routing and agent configuration.

use crate::StoreError;
use rusqlite::{params, Connection, OptionalExtension};
use voxlead_types::{AgentConfig, NumberMapping};

pub fn lookup_number(
    conn: &Connection,
    phone_number: &str,
) -> Result<Option<NumberMapping>, StoreError> {
    let mapping = conn
        .query_row(
            "SELECT phone_number, tenant_id, agent_id FROM number_mappings WHERE phone_number = ?1",
            [phone_number.trim()],
            |row| {
                Ok(NumberMapping {
                    phone_number: row.get(0)?,
                    tenant_id: row.get(1)?,
                    agent_id: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(mapping)
}

pub fn get_agent_config(
    conn: &Connection,
    agent_id: &str,
) -> Result<Option<AgentConfig>, StoreError> {
    let config = conn
        .query_row(
            "SELECT agent_id, tenant_id, system_prompt, voice_provider, voice_id,
                    initial_greeting, language
             FROM agent_configs WHERE agent_id = ?1",
            [agent_id],
            |row| {
                Ok(AgentConfig {
                    agent_id: row.get(0)?,
                    tenant_id: row.get(1)?,
                    system_prompt: row.get(2)?,
                    voice_provider: row.get(3)?,
                    voice_id: row.get(4)?,
                    initial_greeting: row.get(5)?,
                    language: row.get(6)?,
                })
            },
        )
        .optional()?;
    Ok(config)
}

/// Creates or replaces the routing for one number.
pub fn upsert_number_mapping(conn: &Connection, mapping: &NumberMapping) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO number_mappings (phone_number, tenant_id, agent_id)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(phone_number) DO UPDATE SET
            tenant_id = excluded.tenant_id,
            agent_id = excluded.agent_id,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
        params![mapping.phone_number.trim(), mapping.tenant_id, mapping.agent_id],
    )?;
    tracing::info!(
        phone_number = %mapping.phone_number,
        tenant_id = %mapping.tenant_id,
        agent_id = %mapping.agent_id,
        "number mapping saved"
    );
    Ok(())
}

/// Creates or replaces an agent configuration.
///
/// Calls already in progress keep the configuration they read at start.
pub fn upsert_agent_config(conn: &Connection, config: &AgentConfig) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO agent_configs (
            agent_id, tenant_id, system_prompt, voice_provider, voice_id,
            initial_greeting, language
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(agent_id) DO UPDATE SET
            tenant_id = excluded.tenant_id,
            system_prompt = excluded.system_prompt,
            voice_provider = excluded.voice_provider,
            voice_id = excluded.voice_id,
            initial_greeting = excluded.initial_greeting,
            language = excluded.language,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
        params![
            config.agent_id,
            config.tenant_id,
            config.system_prompt,
            config.voice_provider,
            config.voice_id,
            config.initial_greeting,
            config.language,
        ],
    )?;
    tracing::info!(agent_id = %config.agent_id, tenant_id = %config.tenant_id, "agent config saved");
    Ok(())
}
