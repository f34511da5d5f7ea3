//! Outbound Telegram messages
//!
//! Every send is awaited once; a failure is logged and dropped so it never
//! undoes the state change that triggered it.

use dishcore::Order;
use indoc::formatdoc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, MessageId};

use crate::telegram::keyboard::order_keyboard;

#[derive(Clone)]
pub struct Notifier {
    bot: Bot,
    admin_chat_id: ChatId,
}

impl Notifier {
    pub fn new(bot: Bot, admin_chat_id: i64) -> Self {
        Self {
            bot,
            admin_chat_id: ChatId(admin_chat_id),
        }
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    pub fn admin_chat_id(&self) -> i64 {
        self.admin_chat_id.0
    }

    /// Plain text to any chat; returns whether Telegram accepted it
    pub async fn send_text(&self, chat_id: i64, text: &str) -> bool {
        match self.bot.send_message(ChatId(chat_id), text).await {
            Ok(_) => true,
            Err(e) => {
                log::error!("Failed to send message to chat {}: {}", chat_id, e);
                false
            }
        }
    }

    /// Text with an inline keyboard
    pub async fn send_with_keyboard(&self, chat_id: i64, text: &str, keyboard: InlineKeyboardMarkup) -> bool {
        match self.bot.send_message(ChatId(chat_id), text).reply_markup(keyboard).await {
            Ok(_) => true,
            Err(e) => {
                log::error!("Failed to send message with keyboard to chat {}: {}", chat_id, e);
                false
            }
        }
    }

    /// Customers are reached in their private chat with the bot
    pub async fn notify_customer(&self, order: &Order, text: &str) {
        if !self.send_text(order.user_id, text).await {
            log::warn!("Customer of order {} was not notified", order.order_id);
        }
    }

    /// Posts a new order to the admin chat with the driver buttons
    pub async fn notify_new_order(&self, order: &Order, customer: &str) -> bool {
        let text = new_order_text(order, customer);
        match order_keyboard(&order.order_id, order.status) {
            Some(keyboard) => self.send_with_keyboard(self.admin_chat_id.0, &text, keyboard).await,
            None => self.send_text(self.admin_chat_id.0, &text).await,
        }
    }

    /// Replaces the buttons under an admin message; `None` removes them
    pub async fn update_keyboard(&self, chat_id: i64, message_id: i32, keyboard: Option<InlineKeyboardMarkup>) {
        let request = self.bot.edit_message_reply_markup(ChatId(chat_id), MessageId(message_id));
        let result = match keyboard {
            Some(keyboard) => request.reply_markup(keyboard).await,
            None => request.await,
        };
        if let Err(e) = result {
            log::warn!("Failed to edit keyboard of message {} in chat {}: {}", message_id, chat_id, e);
        }
    }
}

/// Admin chat text for a freshly placed order
///
/// The `Order ID:` line is what location replies are matched against.
pub fn new_order_text(order: &Order, customer: &str) -> String {
    let comment = if order.comment.trim().is_empty() {
        "none"
    } else {
        order.comment.trim()
    };

    formatdoc! {"
        🆕 New order
        Order ID: {id}
        User: {customer}
        Items: {items}
        Total: {total:.2}
        Location: {location}
        Comment: {comment}",
        id = order.order_id,
        items = order.items_summary(),
        total = order.total,
        location = order.location.describe(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dishcore::order::{NewOrder, OrderItem};
    use dishcore::{Coordinates, Location};
    use rust_decimal::Decimal;

    fn order(location: Location, comment: &str) -> Order {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Order::pending(
            "111_1714564800000".to_string(),
            NewOrder {
                user_id: 111,
                items: vec![OrderItem::named("Pizza", 2)],
                comment: comment.to_string(),
                location,
                total: Decimal::new(1800, 2),
            },
            now,
        )
    }

    #[test]
    fn test_new_order_text() {
        let text = new_order_text(&order(Location::Point(Coordinates::new(10.0, 20.0)), "ring twice"), "Ana (111)");
        assert_eq!(
            text,
            "🆕 New order\n\
             Order ID: 111_1714564800000\n\
             User: Ana (111)\n\
             Items: Pizza x2\n\
             Total: 18.00\n\
             Location: https://www.google.com/maps?q=10,20\n\
             Comment: ring twice"
        );
    }

    #[test]
    fn test_new_order_text_manual_location() {
        let location = Location::Manual {
            manual: "Knez Mihailova 5".to_string(),
        };
        let text = new_order_text(&order(location, "  "), "111");
        assert!(text.contains("Location: Knez Mihailova 5"));
        assert!(text.ends_with("Comment: none"));
    }
}
