//! Base assembler: the Capp copy and its Namespace.

use rcs_state::Capp;
use serde_json::Value;

use crate::builders;
use crate::director::{Assembler, DirectorContext};
use crate::error::SyncResult;

pub struct BaseAssembler;

impl Assembler for BaseAssembler {
    fn name(&self) -> &'static str {
        "base"
    }

    fn assemble(&self, _ctx: &DirectorContext, capp: &Capp) -> SyncResult<Vec<Value>> {
        Ok(vec![
            builders::capp(capp)?,
            builders::namespace(&capp.metadata.namespace),
        ])
    }
}
