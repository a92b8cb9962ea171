mod profile_changes;
mod profile_states;
