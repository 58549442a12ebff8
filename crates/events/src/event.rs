use chrono::{DateTime, Utc};

/// Something that happened to storefront state.
///
/// Implemented by the cart's event enum so the store can log and
/// timestamp what it applied without knowing each variant.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted name, e.g. `cart.item.added`.
    fn event_type(&self) -> &'static str;

    /// Payload shape version.
    fn version(&self) -> u32;

    fn occurred_at(&self) -> DateTime<Utc>;

    /// Leading segment of [`Event::event_type`] (`cart` for `cart.item.added`).
    fn namespace(&self) -> &'static str {
        let name = self.event_type();
        name.split_once('.').map_or(name, |(head, _)| head)
    }
}
