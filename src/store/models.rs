//! Row types and their wire representations.

use serde::{Deserialize, Serialize};
use sqlx::any::AnyRow;
use sqlx::Row;

use super::StoreError;

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident, $column:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn parse(value: &str) -> Result<Self, StoreError> {
                match value {
                    $($text => Ok($name::$variant),)+
                    other => Err(StoreError::Corrupt { column: $column, value: other.to_string() }),
                }
            }
        }
    };
}

text_enum!(
    /// Order lifecycle.
    OrderStatus, "orders.status" {
        PendingPayment => "pending-payment",
        PaymentConfirmed => "payment-confirmed",
        Processing => "processing",
        Shipped => "shipped",
        Delivered => "delivered",
        Cancelled => "cancelled",
    }
);

text_enum!(
    PaymentMethod, "payment_method" {
        BankTransfer => "bank_transfer",
        VirtualAccountBca => "virtual_account_bca",
        VirtualAccountBri => "virtual_account_bri",
        VirtualAccountBni => "virtual_account_bni",
        VirtualAccountMandiri => "virtual_account_mandiri",
        ShopeePay => "shopeepay",
        GoPay => "gopay",
        Qris => "qris",
    }
);

text_enum!(
    PaymentStatus, "payments.status" {
        Pending => "pending",
        Confirmed => "confirmed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
);

impl OrderStatus {
    /// States that accept no further transitions.
    pub const TERMINAL: [OrderStatus; 2] = [OrderStatus::Delivered, OrderStatus::Cancelled];

    pub fn is_terminal(self) -> bool {
        Self::TERMINAL.contains(&self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub price: i64,
    pub stock: i64,
    pub sold: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Product {
    pub fn from_row(row: &AnyRow) -> Result<Self, StoreError> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            image_url: row.try_get("image_url")?,
            price: row.try_get("price")?,
            stock: row.try_get("stock")?,
            sold: row.try_get("sold")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Create/update payload for a product.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub price: i64,
    #[serde(default)]
    pub stock: i64,
}

impl ProductInput {
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.name.trim().is_empty() {
            return Err(StoreError::Validation("name must not be empty".into()));
        }
        if self.price < 0 {
            return Err(StoreError::Validation("price must not be negative".into()));
        }
        if self.stock < 0 {
            return Err(StoreError::Validation("stock must not be negative".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
    pub product_id: i64,
    pub quantity: i64,
}

/// Order placement payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub customer: CustomerInfo,
    pub shipping_address: String,
    #[serde(default)]
    pub shipping_method: Option<String>,
    pub payment_method: PaymentMethod,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.items.is_empty() {
            return Err(StoreError::Validation("order must contain at least one item".into()));
        }
        if let Some(item) = self.items.iter().find(|i| i.quantity <= 0) {
            return Err(StoreError::Validation(format!(
                "quantity for product {} must be positive",
                item.product_id
            )));
        }
        if self.customer.name.trim().is_empty() {
            return Err(StoreError::Validation("customer name must not be empty".into()));
        }
        if !self.customer.email.contains('@') {
            return Err(StoreError::Validation("customer email is invalid".into()));
        }
        if self.shipping_address.trim().is_empty() {
            return Err(StoreError::Validation("shipping address must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub user_id: Option<i64>,
    pub total_amount: i64,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub shipping_address: String,
    pub shipping_method: Option<String>,
    pub customer: CustomerInfo,
    pub admin_notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    pub fn from_row(row: &AnyRow) -> Result<Self, StoreError> {
        let status: String = row.try_get("status")?;
        let method: String = row.try_get("payment_method")?;
        let customer_info: String = row.try_get("customer_info")?;
        let customer = serde_json::from_str(&customer_info).map_err(|_| StoreError::Corrupt {
            column: "orders.customer_info",
            value: customer_info.clone(),
        })?;

        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            total_amount: row.try_get("total_amount")?,
            status: OrderStatus::parse(&status)?,
            payment_method: PaymentMethod::parse(&method)?,
            shipping_address: row.try_get("shipping_address")?,
            shipping_method: row.try_get("shipping_method")?,
            customer,
            admin_notes: row.try_get("admin_notes")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    /// Unit price at the time of ordering.
    pub price: i64,
}

impl OrderItem {
    pub fn from_row(row: &AnyRow) -> Result<Self, StoreError> {
        Ok(Self {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            price: row.try_get("price")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub amount: i64,
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
    pub confirmed_by: Option<String>,
    pub confirmed_at: Option<i64>,
    pub notes: Option<String>,
    pub created_at: i64,
}

impl Payment {
    pub fn from_row(row: &AnyRow) -> Result<Self, StoreError> {
        let method: String = row.try_get("payment_method")?;
        let status: String = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            amount: row.try_get("amount")?,
            payment_method: PaymentMethod::parse(&method)?,
            status: PaymentStatus::parse(&status)?,
            confirmed_by: row.try_get("confirmed_by")?,
            confirmed_at: row.try_get("confirmed_at")?,
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// An order with its items and latest payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payment: Option<Payment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> NewOrder {
        NewOrder {
            customer: CustomerInfo {
                name: "Rina".into(),
                email: "rina@example.com".into(),
                phone: None,
            },
            shipping_address: "Jl. Merdeka 1".into(),
            shipping_method: None,
            payment_method: PaymentMethod::BankTransfer,
            items: vec![NewOrderItem {
                product_id: 1,
                quantity: 2,
            }],
        }
    }

    #[test]
    fn text_enums_use_wire_spelling() {
        assert_eq!(OrderStatus::PendingPayment.as_str(), "pending-payment");
        assert_eq!(OrderStatus::parse("shipped").unwrap(), OrderStatus::Shipped);
        assert!(matches!(OrderStatus::parse("lost"), Err(StoreError::Corrupt { .. })));
        assert_eq!(
            serde_json::to_value(PaymentMethod::VirtualAccountBca).unwrap(),
            "virtual_account_bca"
        );
    }

    #[test]
    fn order_validation() {
        assert!(order().validate().is_ok());

        let mut empty = order();
        empty.items.clear();
        assert!(empty.validate().is_err());

        let mut zero = order();
        zero.items[0].quantity = 0;
        assert!(zero.validate().is_err());

        let mut bad_email = order();
        bad_email.customer.email = "nobody".into();
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn product_validation() {
        let input = ProductInput {
            name: "Kaos".into(),
            description: None,
            category: None,
            image_url: None,
            price: 75_000,
            stock: 3,
        };
        assert!(input.validate().is_ok());
        assert!(ProductInput { price: -1, ..input.clone() }.validate().is_err());
        assert!(ProductInput { name: " ".into(), ..input }.validate().is_err());
    }
}
