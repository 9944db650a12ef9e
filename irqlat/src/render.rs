use irqlat_common::HIST_SLOTS;

const BAR_WIDTH: usize = 40;

pub fn unit_label(nanoseconds: bool) -> &'static str {
    if nanoseconds {
        "nsecs"
    } else {
        "usecs"
    }
}

pub fn counter_table(rows: &mut Vec<(String, u64)>, value_header: &str) -> Vec<String> {
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format!("{:<26} {:>12}", "HANDLER", value_header));
    for (name, value) in rows.iter() {
        lines.push(format!("{:<26} {:>12}", name, value));
    }
    lines
}

/// One histogram per handler, slot k covering [2^k, 2^(k+1)). Trailing
/// empty slots are trimmed; an all-empty histogram renders nothing.
pub fn log2_histogram(name: &str, slots: &[u64; HIST_SLOTS], unit: &str) -> Vec<String> {
    let last = match slots.iter().rposition(|&count| count != 0) {
        Some(last) => last,
        None => return Vec::new(),
    };
    let max = *slots.iter().max().unwrap();

    let mut lines = Vec::with_capacity(last + 3);
    lines.push(format!("handler = {name}"));
    lines.push(format!("{:>21} : count   distribution", unit));
    for (slot, &count) in slots.iter().take(last + 1).enumerate() {
        let low = if slot == 0 { 0 } else { 1u64 << slot };
        let high = (1u64 << (slot + 1)) - 1;
        let stars = ((count as u128 * BAR_WIDTH as u128) / max as u128) as usize;
        lines.push(format!(
            "{:>9} -> {:<9} : {:<7} |{:<BAR_WIDTH$}|",
            low,
            high,
            count,
            "*".repeat(stars),
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(pairs: &[(usize, u64)]) -> [u64; HIST_SLOTS] {
        let mut slots = [0; HIST_SLOTS];
        for &(idx, count) in pairs {
            slots[idx] = count;
        }
        slots
    }

    #[test]
    fn empty_histogram_renders_nothing() {
        assert!(log2_histogram("eth0", &slots(&[]), "usecs").is_empty());
    }

    #[test]
    fn trailing_slots_are_trimmed() {
        let lines = log2_histogram("eth0", &slots(&[(0, 1), (3, 2)]), "usecs");
        // name + header + slots 0..=3
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "handler = eth0");
        assert!(lines[1].contains("usecs"));
    }

    #[test]
    fn ranges_are_powers_of_two() {
        let lines = log2_histogram("i8042", &slots(&[(2, 4)]), "nsecs");
        assert!(lines[2].contains("0 -> 1"));
        assert!(lines[3].contains("2 -> 3"));
        assert!(lines[4].contains("4 -> 7"));
    }

    #[test]
    fn bar_scales_against_the_largest_slot() {
        let lines = log2_histogram("eth0", &slots(&[(0, 10), (1, 5)]), "usecs");
        let full: String = "*".repeat(40);
        let half: String = "*".repeat(20);
        assert!(lines[2].contains(&full));
        assert!(lines[3].contains(&half));
        assert!(!lines[3].contains(&full));
    }

    #[test]
    fn counter_table_sorts_descending() {
        let mut rows = vec![
            ("timer".to_string(), 3),
            ("rcu".to_string(), 10),
            ("sched".to_string(), 3),
        ];
        let lines = counter_table(&mut rows, "COUNT");
        assert!(lines[0].starts_with("HANDLER"));
        assert!(lines[1].starts_with("rcu"));
        // ties break alphabetically
        assert!(lines[2].starts_with("sched"));
        assert!(lines[3].starts_with("timer"));
    }
}
