//! Settings validation and merging.

use crate::config::{Bound, SettingsBounds};
use crate::error::{Result, RoomError};
use crate::protocol::{PartialSettings, Settings, SettingsPack};

fn check_name(name: &str, bounds: &SettingsBounds) -> Result<()> {
    let len = name.trim().chars().count();
    if len < bounds.name.min_len || len > bounds.name.max_len {
        return Err(RoomError::InvalidMessage(format!(
            "name must be {}..={} characters",
            bounds.name.min_len, bounds.name.max_len
        )));
    }
    Ok(())
}

fn check_bound(field: &str, value: u32, bound: &Bound) -> Result<()> {
    if !bound.contains(value) {
        return Err(RoomError::InvalidMessage(format!(
            "{field} must be within {}..={}, got {value}",
            bound.min, bound.max
        )));
    }
    Ok(())
}

fn check_limit(field: &str, value: Option<u32>, bound: &Bound) -> Result<()> {
    value.map_or(Ok(()), |v| check_bound(field, v, bound))
}

/// Range-check a full settings payload.
pub fn validate_settings(settings: &Settings, bounds: &SettingsBounds) -> Result<()> {
    check_name(&settings.name, bounds)?;
    check_bound("players_limit", settings.players_limit, &bounds.players_limit)?;
    check_limit("time_limit", settings.time_limit, &bounds.time_limit)?;
    check_limit("score_limit", settings.score_limit, &bounds.score_limit)?;
    check_limit("round_limit", settings.round_limit, &bounds.round_limit)?;
    Ok(())
}

/// Range-check the fields present in a partial update.
pub fn validate_partial(partial: &PartialSettings, bounds: &SettingsBounds) -> Result<()> {
    if let Some(name) = &partial.name {
        check_name(name, bounds)?;
    }
    if let Some(players_limit) = partial.players_limit {
        check_bound("players_limit", players_limit, &bounds.players_limit)?;
    }
    check_limit("time_limit", partial.time_limit.flatten(), &bounds.time_limit)?;
    check_limit("score_limit", partial.score_limit.flatten(), &bounds.score_limit)?;
    check_limit("round_limit", partial.round_limit.flatten(), &bounds.round_limit)?;
    Ok(())
}

/// Drop packs with neither pile selected.
pub(crate) fn used_packs(packs: Vec<SettingsPack>) -> Vec<SettingsPack> {
    packs.into_iter().filter(SettingsPack::is_used).collect()
}

/// Overwrite every field present in `partial`.
pub(crate) fn apply_partial(settings: &mut Settings, partial: PartialSettings) {
    if let Some(name) = partial.name {
        settings.name = name.trim().to_owned();
    }
    if let Some(public) = partial.public {
        settings.public = public;
    }
    if let Some(players_limit) = partial.players_limit {
        settings.players_limit = players_limit;
    }
    if let Some(time_limit) = partial.time_limit {
        settings.time_limit = time_limit;
    }
    if let Some(score_limit) = partial.score_limit {
        settings.score_limit = score_limit;
    }
    if let Some(round_limit) = partial.round_limit {
        settings.round_limit = round_limit;
    }
    if let Some(packs) = partial.packs {
        settings.packs = used_packs(packs);
    }
}
