// One of a fixed list of string choices, stored as a byte index

use crate::arena::ByteArena;
use crate::error::{TuneResult, ValidationError};

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub name: String,
    pub short_name: String,
    pub offset: usize,
    pub choices: Vec<String>,
    pub conditional: Option<String>,
}

impl Select {
    pub fn new(
        name: impl Into<String>,
        short_name: impl Into<String>,
        offset: usize,
        choices: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            short_name: short_name.into(),
            offset,
            choices,
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

    pub fn get(&self, arena: &ByteArena) -> TuneResult<&str> {
        let index = arena.read_u8(self.offset)? as usize;
        self.choices
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| {
                ValidationError::ChoiceIndex {
                    field: self.short_name.clone(),
                    index,
                }
                .into()
            })
    }

    pub fn set(&self, arena: &mut ByteArena, value: &str) -> TuneResult<()> {
        let index = self
            .choices
            .iter()
            .position(|c| c == value)
            .filter(|&i| i <= u8::MAX as usize)
            .ok_or_else(|| ValidationError::UnknownChoice {
                field: self.short_name.clone(),
                value: value.to_string(),
            })?;
        arena.write_u8(self.offset, index as u8)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TuneError;

    fn select() -> Select {
        Select::new(
            "Ignition mode",
            "ign_mode",
            1,
            vec!["off".into(), "wasted".into(), "sequential".into()],
        )
    }

    #[test]
    fn test_round_trip() {
        let s = select();
        let mut arena = ByteArena::zeroed(2);
        for choice in ["off", "wasted", "sequential"] {
            s.set(&mut arena, choice).unwrap();
            assert_eq!(s.get(&arena).unwrap(), choice);
        }
        assert_eq!(arena.as_bytes(), &[0, 2]);
    }

    #[test]
    fn test_unknown_choice() {
        let s = select();
        let mut arena = ByteArena::zeroed(2);
        s.set(&mut arena, "wasted").unwrap();
        let err = s.set(&mut arena, "distributor").unwrap_err();
        assert!(matches!(
            err,
            TuneError::Validation(ValidationError::UnknownChoice { .. })
        ));
        assert_eq!(s.get(&arena).unwrap(), "wasted");
    }

    #[test]
    fn test_index_out_of_range() {
        let s = select();
        let arena = ByteArena::new(vec![0, 7]);
        assert!(matches!(
            s.get(&arena),
            Err(TuneError::Validation(ValidationError::ChoiceIndex { index: 7, .. }))
        ));
    }
}
