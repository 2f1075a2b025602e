// Reference to a Variable Table entry, stored as a byte index

use crate::arena::ByteArena;
use crate::core::{Variable, VariableTable};
use crate::error::{TuneResult, ValidationError};

#[derive(Debug, Clone, PartialEq)]
pub struct VarSelect {
    pub name: String,
    pub short_name: String,
    pub offset: usize,
    pub conditional: Option<String>,
}

impl VarSelect {
    pub fn new(name: impl Into<String>, short_name: impl Into<String>, offset: usize) -> Self {
        Self {
            name: name.into(),
            short_name: short_name.into(),
            offset,
            conditional: None,
        }
    }

    pub fn with_conditional(mut self, conditional: Option<String>) -> Self {
        self.conditional = conditional;
        self
    }

    pub fn size(&self) -> usize {
        1
    }

    pub fn get<'v>(&self, arena: &ByteArena, variables: &'v VariableTable) -> TuneResult<&'v Variable> {
        let index = arena.read_u8(self.offset)? as usize;
        Ok(variables.at(index)?)
    }

    /// Point the field at the variable named @short_name
    pub fn set(
        &self,
        arena: &mut ByteArena,
        variables: &VariableTable,
        short_name: &str,
    ) -> TuneResult<()> {
        let index = variables.index_of(short_name)?;
        let index = u8::try_from(index).map_err(|_| ValidationError::VariableIndex { index })?;
        arena.write_u8(self.offset, index)?;
        Ok(())
    }
}
