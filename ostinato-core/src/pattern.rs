//! Pattern generation: held notes + mode + octave settings → note sequence.
//!
//! Patterns are always rebuilt wholesale; nothing here keeps state between
//! calls apart from what the random source consumes.

use ostinato_types::{ArpMode, ArpeggiatorConfig, HeldNote, OctaveMode};

use crate::random::RandomSource;

/// Build the pattern for `notes` (in arrival order) under `config`.
///
/// An empty note set yields an empty pattern.
pub fn generate<R: RandomSource + ?Sized>(
    notes: &[HeldNote],
    config: &ArpeggiatorConfig,
    rng: &mut R,
) -> Vec<u8> {
    if notes.is_empty() {
        return Vec::new();
    }

    let mut ascending: Vec<u8> = notes.iter().map(|n| n.note).collect();
    ascending.sort_unstable();
    ascending.dedup();

    let octaves = config.octaves.max(1);
    let octave_mode = config.octave_mode;

    let mut pattern = match config.mode {
        ArpMode::Up => octave_blocks(&ascending, octaves, octave_mode, false).concat(),
        ArpMode::Down => {
            let descending: Vec<u8> = ascending.iter().rev().copied().collect();
            octave_blocks(&descending, octaves, octave_mode, true).concat()
        }
        ArpMode::UpDown => octave_blocks(&ascending, octaves, octave_mode, false)
            .into_iter()
            .flat_map(there_and_back)
            .collect(),
        ArpMode::DownUp => {
            let descending: Vec<u8> = ascending.iter().rev().copied().collect();
            octave_blocks(&descending, octaves, octave_mode, true)
                .into_iter()
                .flat_map(there_and_back)
                .collect()
        }
        ArpMode::Random => {
            let mut shuffled = ascending.clone();
            fisher_yates(&mut shuffled, rng);
            octave_blocks(&shuffled, octaves, octave_mode, false).concat()
        }
        ArpMode::AsPlayed => {
            let mut by_arrival = notes.to_vec();
            by_arrival.sort_by_key(|n| n.arrival_order);
            let mut played: Vec<u8> = Vec::with_capacity(by_arrival.len());
            for held in by_arrival {
                if !played.contains(&held.note) {
                    played.push(held.note);
                }
            }
            octave_blocks(&played, octaves, octave_mode, false).concat()
        }
        ArpMode::Converge => {
            octave_blocks(&converge(&ascending), octaves, octave_mode, false).concat()
        }
        ArpMode::Diverge => {
            octave_blocks(&diverge(&ascending), octaves, octave_mode, false).concat()
        }
        ArpMode::Chord => ascending,
    };

    if config.mode != ArpMode::Random && config.shuffle_percent > 0.0 {
        partial_shuffle(&mut pattern, config.shuffle_percent, rng);
    }

    pattern
}

/// One block per octave repetition. `descending` flips the octave direction
/// so that Down-style modes travel downwards under `OctaveMode::Up`.
fn octave_blocks(order: &[u8], octaves: u8, octave_mode: OctaveMode, descending: bool) -> Vec<Vec<u8>> {
    let upward = matches!(octave_mode, OctaveMode::Up | OctaveMode::UpDown);
    let sign: i16 = if upward != descending { 12 } else { -12 };

    (0..octaves)
        .map(|octave| {
            let offset = sign * octave as i16;
            let mut block: Vec<u8> = order
                .iter()
                .filter_map(|&note| transpose(note, offset))
                .collect();
            if octave_mode == OctaveMode::UpDown && octave % 2 == 1 {
                block.reverse();
            }
            block
        })
        .filter(|block| !block.is_empty())
        .collect()
}

/// Shift a note by `semitones`, or `None` if it leaves the MIDI range.
pub fn transpose(note: u8, semitones: i16) -> Option<u8> {
    let shifted = note as i16 + semitones;
    if (0..=127).contains(&shifted) {
        Some(shifted as u8)
    } else {
        None
    }
}

/// Block followed by its reverse without the turnaround notes,
/// so `[a, b, c]` becomes `[a, b, c, b]`.
fn there_and_back(block: Vec<u8>) -> Vec<u8> {
    let mut out = block.clone();
    if block.len() > 2 {
        out.extend(block[1..block.len() - 1].iter().rev());
    }
    out
}

/// Outermost-in: first, last, second, second-to-last, ...
fn converge(sorted: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(sorted.len());
    if sorted.is_empty() {
        return out;
    }
    let (mut lo, mut hi) = (0usize, sorted.len() - 1);
    while lo <= hi {
        out.push(sorted[lo]);
        if lo != hi {
            out.push(sorted[hi]);
        }
        lo += 1;
        if hi == 0 {
            break;
        }
        hi -= 1;
    }
    out
}

/// Middle-out: middle, middle+1, middle-1, middle+2, middle-2, ...
fn diverge(sorted: &[u8]) -> Vec<u8> {
    let n = sorted.len();
    let mid = n / 2;
    let mut out = Vec::with_capacity(n);
    if n == 0 {
        return out;
    }
    out.push(sorted[mid]);
    let mut distance = 1;
    while out.len() < n {
        if mid + distance < n {
            out.push(sorted[mid + distance]);
        }
        if distance <= mid {
            out.push(sorted[mid - distance]);
        }
        distance += 1;
    }
    out
}

pub(crate) fn fisher_yates<T, R: RandomSource + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.index(i + 1);
        items.swap(i, j);
    }
}

/// `floor(len * percent / 100)` random pair swaps, with replacement.
fn partial_shuffle<R: RandomSource + ?Sized>(pattern: &mut [u8], percent: f32, rng: &mut R) {
    let len = pattern.len();
    if len < 2 {
        return;
    }
    let swaps = (len as f64 * percent as f64 / 100.0).floor() as usize;
    for _ in 0..swaps {
        let a = rng.index(len);
        let b = rng.index(len);
        pattern.swap(a, b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedRandom;

    fn held(notes: &[u8]) -> Vec<HeldNote> {
        notes
            .iter()
            .enumerate()
            .map(|(i, &note)| HeldNote {
                note,
                velocity: 100,
                arrival_order: i as u64,
            })
            .collect()
    }

    fn config(mode: ArpMode) -> ArpeggiatorConfig {
        ArpeggiatorConfig {
            mode,
            ..Default::default()
        }
    }

    fn gen(notes: &[u8], config: &ArpeggiatorConfig) -> Vec<u8> {
        let mut rng = ScriptedRandom::constant(0.0);
        generate(&held(notes), config, &mut rng)
    }

    #[test]
    fn up_and_down() {
        assert_eq!(gen(&[64, 60, 67], &config(ArpMode::Up)), vec![60, 64, 67]);
        assert_eq!(gen(&[64, 60, 67], &config(ArpMode::Down)), vec![67, 64, 60]);
    }

    #[test]
    fn as_played_keeps_arrival_order() {
        assert_eq!(gen(&[67, 60, 64], &config(ArpMode::AsPlayed)), vec![67, 60, 64]);
    }

    #[test]
    fn up_down_elides_turnaround() {
        assert_eq!(gen(&[60, 64, 67], &config(ArpMode::UpDown)), vec![60, 64, 67, 64]);
        assert_eq!(gen(&[60, 64, 67], &config(ArpMode::DownUp)), vec![67, 64, 60, 64]);
    }

    #[test]
    fn up_down_with_two_notes_has_no_down_leg() {
        assert_eq!(gen(&[60, 64], &config(ArpMode::UpDown)), vec![60, 64]);
        assert_eq!(gen(&[60], &config(ArpMode::UpDown)), vec![60]);
    }

    #[test]
    fn converge_and_diverge() {
        assert_eq!(gen(&[60, 62, 64, 67], &config(ArpMode::Converge)), vec![60, 67, 62, 64]);
        assert_eq!(gen(&[60, 62, 64, 67], &config(ArpMode::Diverge)), vec![64, 67, 62, 60]);
        assert_eq!(gen(&[60, 64, 67], &config(ArpMode::Converge)), vec![60, 67, 64]);
        assert_eq!(gen(&[60, 64, 67], &config(ArpMode::Diverge)), vec![64, 67, 60]);
        assert_eq!(gen(&[60], &config(ArpMode::Diverge)), vec![60]);
    }

    #[test]
    fn chord_is_unexpanded() {
        let cfg = ArpeggiatorConfig {
            mode: ArpMode::Chord,
            octaves: 3,
            ..Default::default()
        };
        assert_eq!(gen(&[67, 60, 64], &cfg), vec![60, 64, 67]);
    }

    #[test]
    fn up_expands_octaves() {
        let cfg = ArpeggiatorConfig {
            octaves: 2,
            ..Default::default()
        };
        assert_eq!(gen(&[60, 64, 67], &cfg), vec![60, 64, 67, 72, 76, 79]);
    }

    #[test]
    fn octave_mode_down_and_up_down() {
        let down = ArpeggiatorConfig {
            octaves: 2,
            octave_mode: OctaveMode::Down,
            ..Default::default()
        };
        assert_eq!(gen(&[60, 64], &down), vec![60, 64, 48, 52]);

        let up_down = ArpeggiatorConfig {
            octaves: 3,
            octave_mode: OctaveMode::UpDown,
            ..Default::default()
        };
        assert_eq!(gen(&[60, 64], &up_down), vec![60, 64, 76, 72, 84, 88]);
    }

    #[test]
    fn down_mode_travels_down_octaves() {
        let cfg = ArpeggiatorConfig {
            mode: ArpMode::Down,
            octaves: 2,
            ..Default::default()
        };
        assert_eq!(gen(&[60, 64, 67], &cfg), vec![67, 64, 60, 55, 52, 48]);
    }

    #[test]
    fn up_down_per_octave_block() {
        let cfg = ArpeggiatorConfig {
            mode: ArpMode::UpDown,
            octaves: 2,
            ..Default::default()
        };
        assert_eq!(gen(&[60, 64, 67], &cfg), vec![60, 64, 67, 64, 72, 76, 79, 76]);
    }

    #[test]
    fn octave_expansion_drops_out_of_range_notes() {
        let cfg = ArpeggiatorConfig {
            octaves: 3,
            ..Default::default()
        };
        assert_eq!(gen(&[100, 110], &cfg), vec![100, 110, 112, 122, 124]);
    }

    #[test]
    fn empty_input_gives_empty_pattern() {
        for mode in ArpMode::ALL {
            assert!(gen(&[], &config(mode)).is_empty());
        }
    }

    #[test]
    fn random_is_a_permutation() {
        let cfg = config(ArpMode::Random);
        let mut rng = ScriptedRandom::new(vec![0.7, 0.2, 0.9, 0.4]);
        let mut pattern = generate(&held(&[60, 62, 64, 65, 67]), &cfg, &mut rng);
        assert_eq!(pattern.len(), 5);
        pattern.sort_unstable();
        assert_eq!(pattern, vec![60, 62, 64, 65, 67]);
    }

    #[test]
    fn random_with_zero_draws_rotates_deterministically() {
        // j = 0 on every Fisher-Yates step.
        assert_eq!(gen(&[60, 64, 67], &config(ArpMode::Random)), vec![64, 67, 60]);
    }

    #[test]
    fn shuffle_zero_leaves_order() {
        let cfg = ArpeggiatorConfig {
            octaves: 2,
            shuffle_percent: 0.0,
            ..Default::default()
        };
        let mut rng = ScriptedRandom::new(vec![0.9, 0.1]);
        assert_eq!(generate(&held(&[60, 64]), &cfg, &mut rng), vec![60, 64, 72, 76]);
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn partial_shuffle_swap_count() {
        let cfg = ArpeggiatorConfig {
            octaves: 2,
            shuffle_percent: 50.0,
            ..Default::default()
        };
        // 4 notes * 50% = 2 swaps = 4 index draws: (0,3) then (1,1).
        let mut rng = ScriptedRandom::new(vec![0.0, 0.99, 0.3, 0.3]);
        let pattern = generate(&held(&[60, 64]), &cfg, &mut rng);
        assert_eq!(pattern, vec![76, 64, 72, 60]);
        assert_eq!(rng.draws(), 4);
    }

    #[test]
    fn transpose_bounds() {
        assert_eq!(transpose(120, 12), None);
        assert_eq!(transpose(5, -12), None);
        assert_eq!(transpose(60, -12), Some(48));
    }
}
