//! The single kill-switch row consulted by C7 and C5.

use diesel::prelude::*;

use crate::database::Database;
use crate::error::EngineResult;
use crate::schema::control_flags;

const KILL_SWITCH_KEY: &str = "kill_switch";

#[derive(Clone)]
pub struct ControlFlagDal {
    db: Database,
}

impl ControlFlagDal {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn kill_switch_engaged(&self) -> EngineResult<bool> {
        self.db
            .interact(|conn| {
                let value: Option<String> = control_flags::table
                    .filter(control_flags::flag_key.eq(KILL_SWITCH_KEY))
                    .select(control_flags::flag_value)
                    .first(conn)
                    .optional()?;
                Ok(value.as_deref() == Some("true"))
            })
            .await
    }

    pub async fn set_kill_switch(&self, engaged: bool) -> EngineResult<()> {
        let value = if engaged { "true" } else { "false" }.to_string();
        self.db
            .interact(move |conn| {
                diesel::update(control_flags::table.filter(control_flags::flag_key.eq(KILL_SWITCH_KEY)))
                    .set(control_flags::flag_value.eq(value))
                    .execute(conn)?;
                Ok(())
            })
            .await
    }
}
