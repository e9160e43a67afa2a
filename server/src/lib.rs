//! WeeCare server: a child medical history tracker on top of a hosted
//! Supabase project.

pub mod backend;
