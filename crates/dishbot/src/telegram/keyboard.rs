use dishcore::OrderStatus;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, WebAppInfo};

use crate::telegram::callback::CallbackAction;

/// Driver buttons for an order in `status`; `None` once the order is finished
pub fn order_keyboard(order_id: &str, status: OrderStatus) -> Option<InlineKeyboardMarkup> {
    let actions: &[(&str, CallbackAction)] = match status {
        OrderStatus::Pending => &[("🍳 Set Preparing", CallbackAction::Preparing), ("⏱️ Calculate ETA", CallbackAction::Eta)],
        OrderStatus::Preparing => &[("⏱️ Calculate ETA", CallbackAction::Eta), ("🚗 Set Arriving", CallbackAction::Arriving)],
        OrderStatus::Eta => &[("🚗 Set Arriving", CallbackAction::Arriving), ("✅ Set Arrived", CallbackAction::Arrived)],
        OrderStatus::Arriving => &[("✅ Set Arrived", CallbackAction::Arrived)],
        OrderStatus::Arrived | OrderStatus::Cancelled => return None,
    };

    let row = actions
        .iter()
        .map(|(label, action)| InlineKeyboardButton::callback(*label, action.data(order_id)))
        .collect::<Vec<_>>();

    Some(InlineKeyboardMarkup::new(vec![row]))
}

/// Single button opening the ordering WebApp
pub fn webapp_keyboard(url: url::Url) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::web_app(
        "🍽️ Open menu",
        WebAppInfo { url },
    )]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    fn callbacks(markup: &InlineKeyboardMarkup) -> Vec<String> {
        markup
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|button| match &button.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_buttons_per_status() {
        let id = "111_1";
        assert_eq!(
            callbacks(&order_keyboard(id, OrderStatus::Pending).unwrap()),
            vec!["preparing:111_1", "eta:111_1"]
        );
        assert_eq!(
            callbacks(&order_keyboard(id, OrderStatus::Preparing).unwrap()),
            vec!["eta:111_1", "arriving:111_1"]
        );
        assert_eq!(
            callbacks(&order_keyboard(id, OrderStatus::Eta).unwrap()),
            vec!["arriving:111_1", "arrived:111_1"]
        );
        assert_eq!(callbacks(&order_keyboard(id, OrderStatus::Arriving).unwrap()), vec!["arrived:111_1"]);
    }

    #[test]
    fn test_finished_orders_have_no_buttons() {
        assert!(order_keyboard("111_1", OrderStatus::Arrived).is_none());
        assert!(order_keyboard("111_1", OrderStatus::Cancelled).is_none());
    }

    #[test]
    fn test_webapp_button() {
        let markup = webapp_keyboard("https://dishdash.example/app".parse().unwrap());
        let button = &markup.inline_keyboard[0][0];
        assert!(matches!(button.kind, InlineKeyboardButtonKind::WebApp(_)));
    }
}
