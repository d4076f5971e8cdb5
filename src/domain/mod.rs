// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Each aggregate has its own subdirectory with its value objects, errors,
// the storage capability it needs and the service that orchestrates it.
//
// This layer knows nothing about sqlx or HTTP; concrete stores live in
// crate::db and the transport in crate::http.
//
// ============================================================================

pub mod account;
