//! First-hit scanning.
//!
//! Every detector and classifier in the crate reduces to "walk items in
//! order, stop at the first one the probe accepts". The probe returns
//! `Option<T>` so one pass can both test and classify a bar.

/// Position and classification of the first accepted item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit<T> {
    pub index: usize,
    pub value: T,
}

/// Return the first item for which `probe` yields `Some`, with its index.
pub fn first_hit<I, T, F>(items: I, mut probe: F) -> Option<Hit<T>>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Option<T>,
{
    items
        .into_iter()
        .enumerate()
        .find_map(|(index, item)| probe(item).map(|value| Hit { index, value }))
}

/// Which of two levels an item reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Touch {
    First,
    Second,
    /// Both on the same item; the order inside it is unknown.
    Both,
}

/// Race two levels: the first item touching either one, classified.
pub fn first_touch<I, A, B>(items: I, mut first: A, mut second: B) -> Option<Hit<Touch>>
where
    I: IntoIterator,
    A: FnMut(&I::Item) -> bool,
    B: FnMut(&I::Item) -> bool,
{
    first_hit(items, |item| match (first(&item), second(&item)) {
        (true, true) => Some(Touch::Both),
        (true, false) => Some(Touch::First),
        (false, true) => Some(Touch::Second),
        (false, false) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_first_match_in_order() {
        let xs = [1, 4, 6, 8];
        let hit = first_hit(&xs, |&x| (x % 2 == 0).then_some(x * 10)).unwrap();
        assert_eq!(hit, Hit { index: 1, value: 40 });
    }

    #[test]
    fn none_when_nothing_matches() {
        let xs: [i32; 3] = [1, 3, 5];
        assert!(first_hit(&xs, |&x| (x > 10).then_some(())).is_none());
    }

    #[test]
    fn probe_sees_pairs_from_windows() {
        let xs = [3, 4, 5, 2, 6];
        let hit = first_hit(xs.windows(2), |w| (w[1] <= w[0]).then_some(w[1]));
        assert_eq!(hit, Some(Hit { index: 2, value: 2 }));
    }

    #[test]
    fn first_touch_classifies_the_first_item_hitting_either_level() {
        let xs = [5, 3, 9, 1];
        let hit = first_touch(&xs, |&&x| x <= 3, |&&x| x >= 9).unwrap();
        assert_eq!(hit, Hit { index: 1, value: Touch::First });

        let hit = first_touch(&xs, |&&x| x <= 1, |&&x| x >= 9).unwrap();
        assert_eq!(hit, Hit { index: 2, value: Touch::Second });

        let hit = first_touch(&xs, |&&x| x >= 5, |&&x| x % 5 == 0).unwrap();
        assert_eq!(hit, Hit { index: 0, value: Touch::Both });

        assert!(first_touch(&xs, |&&x| x > 10, |&&x| x < 0).is_none());
    }
}
