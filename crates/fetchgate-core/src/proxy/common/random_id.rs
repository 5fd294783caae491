// Request id generation

/// Random 64-bit hex id, unique enough within one proxy lifetime.
///
/// Uniqueness among *outstanding* exchanges is enforced separately by
/// [`crate::proxy::exchange::OutstandingIds`].
pub fn generate_request_id() -> String {
    use rand::Rng;
    format!("{:016x}", rand::thread_rng().gen::<u64>())
}
