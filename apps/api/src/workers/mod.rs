pub mod stage_audit;
