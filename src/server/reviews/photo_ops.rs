use crate::error::{Error, Result};

pub const MAX_PHOTOS_PER_REVIEW: usize = 4;

/// Assigns each pending photo the lowest unused slot in [0,3], marking a
/// slot used the moment it is handed out so one batch never collides
/// with itself.
///
/// Runs before any file I/O: a review already holding four photos, or a
/// batch that would push the total past four, is rejected here.
pub fn allocate_positions(occupied: &[i64], pending: usize) -> Result<Vec<i64>> {
    if occupied.len() >= MAX_PHOTOS_PER_REVIEW {
        return Err(Error::PhotoLimitExceeded);
    }
    if occupied.len() + pending > MAX_PHOTOS_PER_REVIEW {
        return Err(Error::PhotoLimitExceeded);
    }

    let mut used = [false; MAX_PHOTOS_PER_REVIEW];
    for &position in occupied {
        if let Ok(slot) = usize::try_from(position) {
            if slot < MAX_PHOTOS_PER_REVIEW {
                used[slot] = true;
            }
        }
    }

    let mut assigned = Vec::with_capacity(pending);
    for _ in 0..pending {
        let slot = used
            .iter()
            .position(|taken| !taken)
            .ok_or(Error::PhotoLimitExceeded)?;
        used[slot] = true;
        assigned.push(slot as i64);
    }

    Ok(assigned)
}
