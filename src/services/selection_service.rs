use crate::{
    error::SelectionError,
    models::quote::{Activity, ClientQuote, Flight, ItemKind, Property, Transportation},
};

/// An item a client can tick on or off.
pub trait Selectable {
    fn item_id(&self) -> &str;
    fn is_selected(&self) -> bool;
    fn set_selected(&mut self, selected: bool);
}

macro_rules! impl_selectable {
    ($($ty:ty),*) => {
        $(
            impl Selectable for $ty {
                fn item_id(&self) -> &str {
                    &self.id
                }

                fn is_selected(&self) -> bool {
                    self.selected
                }

                fn set_selected(&mut self, selected: bool) {
                    self.selected = selected;
                }
            }
        )*
    };
}

impl_selectable!(Property, Activity, Flight, Transportation);

/// Flip one item and clear every other item sharing its group key.
///
/// Only the toggled group is touched: groups that arrived with several
/// selections keep them until one of their items is toggled.
pub fn toggle_grouped<T, K, F>(
    items: &mut [T],
    id: &str,
    kind: &'static str,
    key_of: F,
) -> Result<bool, SelectionError>
where
    T: Selectable,
    K: PartialEq,
    F: Fn(&T) -> K,
{
    let index = items
        .iter()
        .position(|item| item.item_id() == id)
        .ok_or_else(|| SelectionError::NotFound {
            kind,
            id: id.to_string(),
        })?;

    let key = key_of(&items[index]);
    let now_selected = !items[index].is_selected();

    for (i, item) in items.iter_mut().enumerate() {
        if i == index {
            item.set_selected(now_selected);
        } else if key_of(&*item) == key {
            item.set_selected(false);
        }
    }

    Ok(now_selected)
}

/// Flip one item, leaving its siblings alone.
pub fn toggle_independent<T: Selectable>(
    items: &mut [T],
    id: &str,
    kind: &'static str,
) -> Result<bool, SelectionError> {
    let item = items
        .iter_mut()
        .find(|item| item.item_id() == id)
        .ok_or_else(|| SelectionError::NotFound {
            kind,
            id: id.to_string(),
        })?;

    let now_selected = !item.is_selected();
    item.set_selected(now_selected);
    Ok(now_selected)
}

/// Toggle an item of any kind with that kind's exclusivity policy.
pub fn toggle_selection(
    quote: &mut ClientQuote,
    kind: ItemKind,
    id: &str,
) -> Result<bool, SelectionError> {
    let label = kind.as_str();
    match kind {
        ItemKind::Property => {
            toggle_grouped(&mut quote.properties, id, label, |p| p.location.clone())
        }
        ItemKind::Flight => toggle_grouped(&mut quote.flights, id, label, |f| f.flight_type),
        ItemKind::Activity => toggle_independent(&mut quote.activities, id, label),
        ItemKind::Transportation => toggle_independent(&mut quote.transportation, id, label),
    }
}

impl ClientQuote {
    pub fn toggle(&mut self, kind: ItemKind, id: &str) -> Result<bool, SelectionError> {
        toggle_selection(self, kind, id)
    }

    fn selected_of(&self, kind: ItemKind, id: &str) -> Option<bool> {
        fn find<T: Selectable>(items: &[T], id: &str) -> Option<bool> {
            items
                .iter()
                .find(|item| item.item_id() == id)
                .map(Selectable::is_selected)
        }

        match kind {
            ItemKind::Property => find(&self.properties, id),
            ItemKind::Activity => find(&self.activities, id),
            ItemKind::Flight => find(&self.flights, id),
            ItemKind::Transportation => find(&self.transportation, id),
        }
    }
}

fn wanted<T: Selectable>(
    kind: ItemKind,
    items: &[T],
) -> impl Iterator<Item = (ItemKind, String, bool)> + '_ {
    items
        .iter()
        .map(move |item| (kind, item.item_id().to_string(), item.is_selected()))
}

/// Carry a client's selections from `submitted` onto `quote`.
///
/// Only `selected` flags move, and only for items `quote` already has. Each
/// change goes through [`toggle_selection`], so grouped kinds stay exclusive.
/// Returns how many items changed state.
pub fn apply_selections(quote: &mut ClientQuote, submitted: &ClientQuote) -> usize {
    let requested: Vec<(ItemKind, String, bool)> =
        wanted(ItemKind::Property, &submitted.properties)
            .chain(wanted(ItemKind::Activity, &submitted.activities))
            .chain(wanted(ItemKind::Flight, &submitted.flights))
            .chain(wanted(ItemKind::Transportation, &submitted.transportation))
            .collect();

    let mut changed = 0;
    for (kind, id, selected) in requested {
        match quote.selected_of(kind, &id) {
            Some(current) if current != selected => {
                if quote.toggle(kind, &id).is_ok() {
                    changed += 1;
                }
            }
            Some(_) => {}
            None => log::debug!("Ignoring unknown {} {id} in client selections", kind.as_str()),
        }
    }
    changed
}
