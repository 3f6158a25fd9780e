//! The user's single active cart.
//!
//! Every mutation reads the cart, applies a pure change and writes it back
//! with a version check, retrying a bounded number of times when another
//! request got there first.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    app_error::AppError,
    domain::{Cart, CartItem, Medicine},
    repositories::{CartRepository, CatalogRepository},
};

pub const MAX_CART_WRITE_ATTEMPTS: usize = 5;

/// The write a mutation decided on.
enum CartWrite {
    Insert(Cart),
    Replace(Cart),
    Delete { user_id: Uuid, version: i64 },
}

impl CartWrite {
    /// Replaces the cart, or deletes it once the last item is gone.
    fn store(cart: Cart) -> Self {
        if cart.items.is_empty() {
            CartWrite::Delete {
                user_id: cart.user_id,
                version: cart.version,
            }
        } else {
            CartWrite::Replace(cart)
        }
    }
}

#[derive(Clone)]
pub struct CartService {
    catalog: Arc<dyn CatalogRepository>,
    carts: Arc<dyn CartRepository>,
}

impl CartService {
    pub fn new(catalog: Arc<dyn CatalogRepository>, carts: Arc<dyn CartRepository>) -> Self {
        Self { catalog, carts }
    }

    /// Returns the cart after dropping items whose medicine left the catalog.
    /// `None` means the user has no cart, which is not an error.
    pub async fn get(&self, user_id: Uuid) -> Result<Option<Cart>, AppError> {
        for attempt in 1..=MAX_CART_WRITE_ATTEMPTS {
            let Some(mut cart) = self.carts.find_by_user(user_id).await? else {
                return Ok(None);
            };

            let mut valid_items = Vec::with_capacity(cart.items.len());
            for item in &cart.items {
                if self.catalog.find_medicine(item.medicine_id).await?.is_some() {
                    valid_items.push(item.clone());
                } else {
                    tracing::warn!(
                        "Pruning medicine {} from cart of user {}: no longer in catalog",
                        item.medicine_id,
                        user_id
                    );
                }
            }

            if !cart.items.is_empty() && valid_items.len() == cart.items.len() {
                return Ok(Some(cart));
            }

            cart.items = valid_items;
            cart.recompute_total();

            if let Some(result) = self.apply(CartWrite::store(cart)).await? {
                return Ok(result);
            }
            tracing::debug!("Cart of user {} changed while pruning (attempt {})", user_id, attempt);
        }

        Err(concurrent_modification())
    }

    pub async fn add(
        &self,
        user_id: Uuid,
        medicine_id: Uuid,
        quantity: i32,
    ) -> Result<Cart, AppError> {
        if quantity < 1 {
            return Err(AppError::InvalidInput(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let medicine = self.medicine(medicine_id).await?;
        ensure_in_stock(&medicine, quantity)?;

        let cart = self
            .mutate(user_id, |current| add_item(user_id, current, &medicine, quantity))
            .await?;

        cart.ok_or_else(|| AppError::Other(anyhow::anyhow!("Cart vanished after adding an item")))
    }

    pub async fn remove(&self, user_id: Uuid, medicine_id: Uuid) -> Result<Option<Cart>, AppError> {
        self.mutate(user_id, |current| {
            let mut cart = current.ok_or_else(cart_not_found)?;
            cart.remove_item(medicine_id);
            cart.recompute_total();
            Ok(CartWrite::store(cart))
        })
        .await
    }

    pub async fn update_quantity(
        &self,
        user_id: Uuid,
        medicine_id: Uuid,
        quantity: i32,
    ) -> Result<Option<Cart>, AppError> {
        if quantity < 0 {
            return Err(AppError::InvalidInput(
                "Quantity cannot be negative".to_string(),
            ));
        }

        let current = self.carts.find_by_user(user_id).await?;
        match &current {
            None => return Err(cart_not_found()),
            Some(cart) if !cart.contains(medicine_id) => return Err(item_not_found()),
            _ => {}
        }

        if quantity == 0 {
            return self.remove(user_id, medicine_id).await;
        }

        let medicine = self.medicine(medicine_id).await?;
        ensure_in_stock(&medicine, quantity)?;

        self.mutate(user_id, |current| {
            let mut cart = current.ok_or_else(cart_not_found)?;
            let item = cart.item_mut(medicine_id).ok_or_else(item_not_found)?;
            item.quantity = quantity;
            cart.recompute_total();
            Ok(CartWrite::store(cart))
        })
        .await
    }

    /// Idempotent.
    pub async fn clear(&self, user_id: Uuid) -> Result<(), AppError> {
        self.carts.delete_by_user(user_id).await?;
        Ok(())
    }

    async fn medicine(&self, medicine_id: Uuid) -> Result<Medicine, AppError> {
        self.catalog
            .find_medicine(medicine_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Medicine not found".to_string()))
    }

    async fn mutate<F>(&self, user_id: Uuid, change: F) -> Result<Option<Cart>, AppError>
    where
        F: Fn(Option<Cart>) -> Result<CartWrite, AppError>,
    {
        for attempt in 1..=MAX_CART_WRITE_ATTEMPTS {
            let current = self.carts.find_by_user(user_id).await?;
            if let Some(result) = self.apply(change(current)?).await? {
                return Ok(result);
            }
            tracing::debug!("Cart of user {} changed concurrently (attempt {})", user_id, attempt);
        }

        Err(concurrent_modification())
    }

    /// `Ok(None)` when the version check failed and the caller should retry.
    async fn apply(&self, write: CartWrite) -> Result<Option<Option<Cart>>, AppError> {
        let applied = match write {
            CartWrite::Insert(cart) => self.carts.insert(&cart).await?.then_some(Some(cart)),
            CartWrite::Replace(cart) => self.carts.replace(&cart).await?.then(|| {
                Some(Cart {
                    version: cart.version + 1,
                    ..cart
                })
            }),
            CartWrite::Delete { user_id, version } => {
                self.carts.delete(user_id, version).await?.then_some(None)
            }
        };
        Ok(applied)
    }
}

fn add_item(
    user_id: Uuid,
    current: Option<Cart>,
    medicine: &Medicine,
    quantity: i32,
) -> Result<CartWrite, AppError> {
    let new_item = CartItem {
        medicine_id: medicine.id,
        quantity,
        price: medicine.price,
    };

    let Some(mut cart) = current else {
        let mut cart = Cart::new(user_id, medicine.pharmacy_id);
        cart.items.push(new_item);
        cart.recompute_total();
        return Ok(CartWrite::Insert(cart));
    };

    if cart.items.is_empty() {
        cart.pharmacy_id = medicine.pharmacy_id;
    } else if cart.pharmacy_id != medicine.pharmacy_id {
        return Err(AppError::Conflict(
            "Can only order from one pharmacy at a time".to_string(),
        ));
    }

    // The cumulative quantity is not re-checked against stock here.
    match cart.item_mut(medicine.id) {
        Some(item) => item.quantity += quantity,
        None => cart.items.push(new_item),
    }
    cart.recompute_total();

    Ok(CartWrite::Replace(cart))
}

fn ensure_in_stock(medicine: &Medicine, quantity: i32) -> Result<(), AppError> {
    if medicine.stock_quantity < quantity {
        return Err(AppError::InvalidState("Insufficient stock".to_string()));
    }
    Ok(())
}

fn cart_not_found() -> AppError {
    AppError::NotFound("Cart not found".to_string())
}

fn item_not_found() -> AppError {
    AppError::NotFound("Item not found in cart".to_string())
}

fn concurrent_modification() -> AppError {
    AppError::Conflict("Cart was modified concurrently, please retry".to_string())
}
