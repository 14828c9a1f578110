pub mod merge_vars;
mod pending;
mod record;
pub mod status;

#[cfg(test)]
mod tests;
