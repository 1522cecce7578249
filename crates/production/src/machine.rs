use serde::{Deserialize, Serialize};

use shopfloor_core::{DomainError, DomainResult, Entity, MachineId};

const NAME_MAX_LEN: usize = 120;
const SUBDIVISION_MAX_LEN: usize = 120;
const LOCATION_MAX_LEN: usize = 255;

/// A machine on the shop floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub id: MachineId,
    pub name: String,
    /// Workshop or section the machine belongs to.
    pub subdivision: String,
    pub location_description: String,
}

impl Entity for Machine {
    type Id = MachineId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewMachine {
    pub name: String,
    #[serde(default)]
    pub subdivision: String,
    #[serde(default)]
    pub location_description: String,
}

impl NewMachine {
    pub fn validate(mut self) -> DomainResult<Self> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        check_len("name", &self.name, NAME_MAX_LEN)?;
        check_len("subdivision", &self.subdivision, SUBDIVISION_MAX_LEN)?;
        check_len("location_description", &self.location_description, LOCATION_MAX_LEN)?;
        Ok(self)
    }

    pub fn into_machine(self, id: MachineId) -> Machine {
        Machine {
            id,
            name: self.name,
            subdivision: self.subdivision,
            location_description: self.location_description,
        }
    }
}

fn check_len(field: &str, value: &str, max: usize) -> DomainResult<()> {
    if value.chars().count() > max {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_trimmed_and_required() {
        let m = NewMachine {
            name: " Lathe 3 ".into(),
            subdivision: "Shop 1".into(),
            location_description: String::new(),
        }
        .validate()
        .unwrap();
        assert_eq!(m.name, "Lathe 3");

        let err = NewMachine {
            name: "".into(),
            subdivision: String::new(),
            location_description: String::new(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, DomainError::validation("name cannot be empty"));
    }
}
