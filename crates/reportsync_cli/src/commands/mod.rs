pub(crate) mod account;
pub(crate) mod cursors;
pub(crate) mod meta;
pub(crate) mod migrate;
pub(crate) mod output;
pub(crate) mod run;
pub(crate) mod tasks;
