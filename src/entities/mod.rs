mod group;
mod membership;
mod page;
mod place;

pub use group::{NewGroup, PlaceGroup};
pub use membership::{MembershipEdit, Memberships};
pub use page::{Page, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use place::{Category, NewPlace, Place};

#[cfg(test)]
pub(crate) use place::new_place;

use crate::error::{invalid_input_error, Error};

pub const MAX_NAME_LENGTH: usize = 200;
pub const MAX_DESCRIPTION_LENGTH: usize = 4000;

fn validate_text(name: &str, description: Option<&str>) -> Result<(), Error> {
    if name.trim().is_empty() {
        return Err(invalid_input_error("name must not be blank"));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(invalid_input_error(format!(
            "name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }

    if description.map_or(false, |d| d.chars().count() > MAX_DESCRIPTION_LENGTH) {
        return Err(invalid_input_error(format!(
            "description must be at most {MAX_DESCRIPTION_LENGTH} characters"
        )));
    }

    Ok(())
}
