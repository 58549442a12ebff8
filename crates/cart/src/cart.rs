use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lavka_catalog::{Product, ProductId};
use lavka_core::Aggregate;
use lavka_events::Event;

/// One product-and-quantity pairing.
///
/// `product` is the snapshot taken when the line was created; later catalog
/// changes do not flow into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    pub fn new(product: Product, quantity: u32) -> Self {
        Self { product, quantity }
    }

    /// `price * quantity`, in smallest currency unit.
    pub fn subtotal(&self) -> u64 {
        self.product.price.saturating_mul(u64::from(self.quantity))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    /// The requested quantity exceeds what the product has in stock.
    #[error("insufficient stock for {product_id}: only {available} available")]
    InsufficientStock { product_id: ProductId, available: u32 },

    #[error("quantity must be at least 1 (got {0})")]
    InvalidQuantity(u32),
}

/// Aggregate: the session's cart.
///
/// Lines are unique by product id and keep insertion order. `total` and
/// `count` are always computed from the lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
    version: u64,
}

impl Cart {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product.id == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of `price * quantity` over all lines.
    pub fn total(&self) -> u64 {
        self.lines.iter().map(CartLine::subtotal).fold(0, u64::saturating_add)
    }

    /// Sum of quantities over all lines.
    pub fn count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.lines.iter().position(|l| &l.product.id == product_id)
    }
}

/// Command: AddItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddItem {
    pub product: Product,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveItem {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateQuantity.
///
/// Zero or negative quantities remove the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateQuantity {
    pub product_id: ProductId,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ClearCart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearCart {
    pub occurred_at: DateTime<Utc>,
}

/// Command: LoadCart (hydration from a persisted snapshot; no stock checks).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadCart {
    pub lines: Vec<CartLine>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartCommand {
    AddItem(AddItem),
    RemoveItem(RemoveItem),
    UpdateQuantity(UpdateQuantity),
    ClearCart(ClearCart),
    LoadCart(LoadCart),
}

/// Event: ItemAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAdded {
    pub product: Product,
    /// Units added by this command.
    pub added: u32,
    /// Resulting line quantity.
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRemoved {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuantityUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityUpdated {
    pub product_id: ProductId,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CartCleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartCleared {
    pub occurred_at: DateTime<Utc>,
}

/// Event: CartLoaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLoaded {
    pub lines: Vec<CartLine>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartEvent {
    ItemAdded(ItemAdded),
    ItemRemoved(ItemRemoved),
    QuantityUpdated(QuantityUpdated),
    CartCleared(CartCleared),
    CartLoaded(CartLoaded),
}

impl Event for CartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CartEvent::ItemAdded(_) => "cart.item.added",
            CartEvent::ItemRemoved(_) => "cart.item.removed",
            CartEvent::QuantityUpdated(_) => "cart.item.quantity_updated",
            CartEvent::CartCleared(_) => "cart.cleared",
            CartEvent::CartLoaded(_) => "cart.loaded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CartEvent::ItemAdded(e) => e.occurred_at,
            CartEvent::ItemRemoved(e) => e.occurred_at,
            CartEvent::QuantityUpdated(e) => e.occurred_at,
            CartEvent::CartCleared(e) => e.occurred_at,
            CartEvent::CartLoaded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Cart {
    type Command = CartCommand;
    type Event = CartEvent;
    type Error = CartError;

    fn version(&self) -> u64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CartEvent::ItemAdded(e) => {
                let line = CartLine::new(e.product.clone(), e.quantity);
                // The added product is the one stock was checked against, so
                // it replaces the line's snapshot in place.
                match self.position(&e.product.id) {
                    Some(idx) => self.lines[idx] = line,
                    None => self.lines.push(line),
                }
            }
            CartEvent::ItemRemoved(e) => {
                self.lines.retain(|l| l.product.id != e.product_id);
            }
            CartEvent::QuantityUpdated(e) => {
                if let Some(idx) = self.position(&e.product_id) {
                    self.lines[idx].quantity = e.quantity;
                }
            }
            CartEvent::CartCleared(_) => {
                self.lines.clear();
            }
            CartEvent::CartLoaded(e) => {
                self.lines = e.lines.clone();
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CartCommand::AddItem(cmd) => self.handle_add(cmd),
            CartCommand::RemoveItem(cmd) => Ok(self.handle_remove(&cmd.product_id, cmd.occurred_at)),
            CartCommand::UpdateQuantity(cmd) => self.handle_update_quantity(cmd),
            CartCommand::ClearCart(cmd) => Ok(vec![CartEvent::CartCleared(CartCleared {
                occurred_at: cmd.occurred_at,
            })]),
            CartCommand::LoadCart(cmd) => Ok(vec![CartEvent::CartLoaded(CartLoaded {
                lines: merge_lines(&cmd.lines),
                occurred_at: cmd.occurred_at,
            })]),
        }
    }
}

impl Cart {
    fn handle_add(&self, cmd: &AddItem) -> Result<Vec<CartEvent>, CartError> {
        if cmd.quantity == 0 {
            return Err(CartError::InvalidQuantity(cmd.quantity));
        }

        let existing = self.line(&cmd.product.id).map_or(0, |l| l.quantity);
        // Stock comes from the product handed in, which is the freshest copy
        // the caller has.
        let quantity = existing
            .checked_add(cmd.quantity)
            .filter(|q| *q <= cmd.product.stock)
            .ok_or_else(|| CartError::InsufficientStock {
                product_id: cmd.product.id.clone(),
                available: cmd.product.stock,
            })?;

        Ok(vec![CartEvent::ItemAdded(ItemAdded {
            product: cmd.product.clone(),
            added: cmd.quantity,
            quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove(&self, product_id: &ProductId, occurred_at: DateTime<Utc>) -> Vec<CartEvent> {
        vec![CartEvent::ItemRemoved(ItemRemoved {
            product_id: product_id.clone(),
            occurred_at,
        })]
    }

    fn handle_update_quantity(&self, cmd: &UpdateQuantity) -> Result<Vec<CartEvent>, CartError> {
        if cmd.quantity <= 0 {
            return Ok(self.handle_remove(&cmd.product_id, cmd.occurred_at));
        }

        let Some(line) = self.line(&cmd.product_id) else {
            return Ok(Vec::new());
        };

        // Stock here is the line's snapshot; there is no fresher product in hand.
        let available = line.product.stock;
        let quantity = u32::try_from(cmd.quantity)
            .ok()
            .filter(|q| *q <= available)
            .ok_or_else(|| CartError::InsufficientStock {
                product_id: cmd.product_id.clone(),
                available,
            })?;

        Ok(vec![CartEvent::QuantityUpdated(QuantityUpdated {
            product_id: cmd.product_id.clone(),
            quantity,
            occurred_at: cmd.occurred_at,
        })])
    }
}

/// Enforce uniqueness by product id on externally supplied lines.
///
/// Duplicates fold into the first occurrence (quantities summed); zero-quantity
/// lines are dropped.
fn merge_lines(lines: &[CartLine]) -> Vec<CartLine> {
    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines.iter().filter(|l| l.quantity > 0) {
        match merged.iter_mut().find(|m| m.product.id == line.product.id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => merged.push(line.clone()),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use lavka_catalog::Category;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn product(id: &str, price: u64, stock: u32) -> Product {
        Product::new(id, format!("Product {id}"), Category::Smartphones, price, stock)
    }

    fn add(product: &Product, quantity: u32) -> CartCommand {
        CartCommand::AddItem(AddItem {
            product: product.clone(),
            quantity,
            occurred_at: test_time(),
        })
    }

    fn remove(id: &str) -> CartCommand {
        CartCommand::RemoveItem(RemoveItem {
            product_id: ProductId::from(id),
            occurred_at: test_time(),
        })
    }

    fn update(id: &str, quantity: i64) -> CartCommand {
        CartCommand::UpdateQuantity(UpdateQuantity {
            product_id: ProductId::from(id),
            quantity,
            occurred_at: test_time(),
        })
    }

    fn clear() -> CartCommand {
        CartCommand::ClearCart(ClearCart { occurred_at: test_time() })
    }

    fn load(lines: Vec<CartLine>) -> CartCommand {
        CartCommand::LoadCart(LoadCart {
            lines,
            occurred_at: test_time(),
        })
    }

    #[test]
    fn add_item_emits_item_added_with_resulting_quantity() {
        let mut cart = Cart::empty();
        let p1 = product("p1", 100, 5);

        let events = cart.execute(&add(&p1, 2)).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            CartEvent::ItemAdded(e) => {
                assert_eq!(e.product.name, "Product p1");
                assert_eq!(e.added, 2);
                assert_eq!(e.quantity, 2);
            }
            _ => panic!("Expected ItemAdded event"),
        }

        let events = cart.execute(&add(&p1, 3)).unwrap();
        match &events[0] {
            CartEvent::ItemAdded(e) => {
                assert_eq!(e.added, 3);
                assert_eq!(e.quantity, 5);
            }
            _ => panic!("Expected ItemAdded event"),
        }
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.count(), 5);
        assert_eq!(cart.total(), 500);
    }

    #[test]
    fn add_beyond_stock_is_rejected_and_state_unchanged() {
        let mut cart = Cart::empty();
        let p1 = product("p1", 100, 2);

        cart.execute(&add(&p1, 1)).unwrap();
        assert_eq!((cart.total(), cart.count()), (100, 1));
        let before = cart.clone();

        let err = cart.execute(&add(&p1, 2)).unwrap_err();
        assert_eq!(
            err,
            CartError::InsufficientStock {
                product_id: ProductId::from("p1"),
                available: 2,
            }
        );
        assert_eq!(cart, before);
        assert_eq!((cart.total(), cart.count()), (100, 1));
    }

    #[test]
    fn first_add_beyond_stock_is_rejected() {
        let cart = Cart::empty();
        let err = cart.handle(&add(&product("p1", 10, 0), 1)).unwrap_err();
        assert!(matches!(err, CartError::InsufficientStock { available: 0, .. }));
    }

    #[test]
    fn add_zero_is_invalid() {
        let cart = Cart::empty();
        let err = cart.handle(&add(&product("p1", 10, 3), 0)).unwrap_err();
        assert_eq!(err, CartError::InvalidQuantity(0));
    }

    #[test]
    fn add_checks_stock_of_the_product_passed_in() {
        let mut cart = Cart::empty();
        cart.execute(&add(&product("p1", 10, 2), 2)).unwrap();

        // Upstream restocked; the fresher record allows more.
        let restocked = product("p1", 10, 5);
        cart.execute(&add(&restocked, 3)).unwrap();
        let line = cart.line(&ProductId::from("p1")).unwrap();
        assert_eq!(line.quantity, 5);
        assert_eq!(line.product.stock, 5);

        // Restating the current quantity stays within the refreshed stock.
        let events = cart.execute(&update("p1", 5)).unwrap();
        assert!(matches!(events.as_slice(), [CartEvent::QuantityUpdated(_)]));
        assert_eq!(
            cart.execute(&update("p1", 6)).unwrap_err(),
            CartError::InsufficientStock {
                product_id: ProductId::from("p1"),
                available: 5,
            }
        );
    }

    #[test]
    fn add_after_stock_drop_checks_the_lower_stock() {
        let mut cart = Cart::empty();
        cart.execute(&add(&product("p1", 10, 5), 2)).unwrap();

        let err = cart.execute(&add(&product("p1", 10, 2), 1)).unwrap_err();
        assert_eq!(
            err,
            CartError::InsufficientStock {
                product_id: ProductId::from("p1"),
                available: 2,
            }
        );
        assert_eq!(cart.line(&ProductId::from("p1")).unwrap().product.stock, 5);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut cart = Cart::empty();
        for id in ["a", "b", "c"] {
            cart.execute(&add(&product(id, 1, 10), 1)).unwrap();
        }
        cart.execute(&add(&product("a", 1, 10), 1)).unwrap();
        cart.execute(&update("b", 4)).unwrap();
        cart.execute(&remove("a")).unwrap();

        let ids: Vec<&str> = cart.lines().iter().map(|l| l.product.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn remove_missing_id_is_a_noop() {
        let mut cart = Cart::empty();
        cart.execute(&add(&product("p1", 100, 2), 1)).unwrap();
        let lines_before = cart.lines().to_vec();

        let events = cart.execute(&remove("ghost")).unwrap();
        assert!(matches!(events.as_slice(), [CartEvent::ItemRemoved(_)]));
        assert_eq!(cart.lines(), lines_before.as_slice());
    }

    #[test]
    fn update_to_zero_behaves_like_remove() {
        let p1 = product("p1", 100, 5);
        let mut via_update = Cart::empty();
        via_update.execute(&add(&p1, 2)).unwrap();
        let mut via_remove = via_update.clone();

        let update_events = via_update.execute(&update("p1", 0)).unwrap();
        let remove_events = via_remove.execute(&remove("p1")).unwrap();

        assert!(via_update.is_empty());
        assert_eq!((via_update.total(), via_update.count()), (0, 0));
        assert_eq!(via_update, via_remove);
        assert_eq!(update_events.len(), remove_events.len());
        assert!(matches!(update_events.as_slice(), [CartEvent::ItemRemoved(_)]));
    }

    #[test]
    fn update_negative_removes_line() {
        let mut cart = Cart::empty();
        cart.execute(&add(&product("p1", 100, 5), 2)).unwrap();
        cart.execute(&update("p1", -3)).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn update_beyond_stock_keeps_quantity() {
        let mut cart = Cart::empty();
        cart.execute(&add(&product("p1", 100, 3), 2)).unwrap();

        let err = cart.execute(&update("p1", 4)).unwrap_err();
        assert!(matches!(err, CartError::InsufficientStock { available: 3, .. }));
        assert_eq!(cart.line(&ProductId::from("p1")).unwrap().quantity, 2);

        cart.execute(&update("p1", 3)).unwrap();
        assert_eq!(cart.count(), 3);
        assert_eq!(cart.total(), 300);
    }

    #[test]
    fn update_missing_line_emits_nothing() {
        let mut cart = Cart::empty();
        let events = cart.execute(&update("ghost", 2)).unwrap();
        assert!(events.is_empty());
        assert_eq!(cart.version(), 0);
    }

    #[test]
    fn clear_empties_everything() {
        let mut cart = Cart::empty();
        cart.execute(&add(&product("p1", 100, 5), 1)).unwrap();
        cart.execute(&add(&product("p2", 250, 5), 2)).unwrap();

        cart.execute(&clear()).unwrap();
        assert!(cart.lines().is_empty());
        assert_eq!((cart.total(), cart.count()), (0, 0));
    }

    #[test]
    fn load_skips_stock_validation() {
        let mut cart = Cart::empty();
        // Stale snapshot: quantity above the recorded stock.
        let lines = vec![
            CartLine::new(product("p1", 100, 1), 4),
            CartLine::new(product("p2", 30, 10), 2),
        ];

        cart.execute(&load(lines.clone())).unwrap();
        assert_eq!(cart.lines(), lines.as_slice());
        assert_eq!(cart.total(), 460);
        assert_eq!(cart.count(), 6);
    }

    #[test]
    fn load_merges_duplicate_ids_and_drops_empty_lines() {
        let mut cart = Cart::empty();
        cart.execute(&load(vec![
            CartLine::new(product("p1", 10, 9), 2),
            CartLine::new(product("p2", 5, 9), 0),
            CartLine::new(product("p1", 10, 9), 3),
        ]))
        .unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.line(&ProductId::from("p1")).unwrap().quantity, 5);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let mut cart = Cart::empty();
        cart.execute(&add(&product("p1", 100, 5), 1)).unwrap();
        let before = cart.clone();

        let cmd = add(&product("p1", 100, 5), 1);
        let events1 = cart.handle(&cmd).unwrap();
        let events2 = cart.handle(&cmd).unwrap();

        assert_eq!(cart, before);
        assert_eq!(events1, events2);
    }

    #[test]
    fn version_increments_on_apply() {
        let mut cart = Cart::empty();
        assert_eq!(cart.version(), 0);
        cart.execute(&add(&product("p1", 1, 5), 1)).unwrap();
        assert_eq!(cart.version(), 1);
        cart.execute(&clear()).unwrap();
        assert_eq!(cart.version(), 2);
    }

    #[test]
    fn event_types_are_stable() {
        let mut cart = Cart::empty();
        let events = cart.execute(&add(&product("p1", 1, 5), 1)).unwrap();
        assert_eq!(events[0].event_type(), "cart.item.added");
        assert_eq!(events[0].version(), 1);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Add { idx: usize, quantity: u32, stock: u32 },
            Remove { idx: usize },
            Update { idx: usize, quantity: i64 },
            Clear,
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                4 => (0usize..4, 0u32..6, 0u32..8)
                    .prop_map(|(idx, quantity, stock)| Op::Add { idx, quantity, stock }),
                2 => (0usize..4).prop_map(|idx| Op::Remove { idx }),
                3 => (0usize..4, -2i64..8).prop_map(|(idx, quantity)| Op::Update { idx, quantity }),
                1 => Just(Op::Clear),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: totals are derived and stock is never exceeded after any
            /// sequence, including products whose stock changes between adds.
            #[test]
            fn totals_stay_derived_and_stock_holds(
                prices in proptest::collection::vec(0u64..1_000, 4),
                ops in proptest::collection::vec(op(), 0..40),
            ) {
                let ids: Vec<String> = (0..4).map(|i| format!("p{i}")).collect();
                let mut cart = Cart::empty();

                for op in ops {
                    let before = cart.clone();
                    let cmd = match op {
                        Op::Add { idx, quantity, stock } => add(&product(&ids[idx], prices[idx], stock), quantity),
                        Op::Remove { idx } => remove(&ids[idx]),
                        Op::Update { idx, quantity } => update(&ids[idx], quantity),
                        Op::Clear => clear(),
                    };

                    if cart.execute(&cmd).is_err() {
                        prop_assert_eq!(&cart, &before);
                    }

                    let total: u64 = cart.lines().iter().map(|l| l.product.price * u64::from(l.quantity)).sum();
                    let count: u64 = cart.lines().iter().map(|l| u64::from(l.quantity)).sum();
                    prop_assert_eq!(cart.total(), total);
                    prop_assert_eq!(cart.count(), count);

                    for line in cart.lines() {
                        prop_assert!(line.quantity >= 1);
                        prop_assert!(line.quantity <= line.product.stock);
                    }

                    let mut ids: Vec<&ProductId> = cart.lines().iter().map(|l| &l.product.id).collect();
                    ids.sort();
                    ids.dedup();
                    prop_assert_eq!(ids.len(), cart.lines().len());
                }
            }
        }
    }
}
