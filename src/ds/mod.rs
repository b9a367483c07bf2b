pub(crate) mod slot_arena;
