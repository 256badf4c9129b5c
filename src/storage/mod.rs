pub mod challenge_store;
