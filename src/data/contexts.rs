//! Standard single-base-substitution trinucleotide contexts

const SUBSTITUTIONS: [&str; 6] = ["C>A", "C>G", "C>T", "T>A", "T>C", "T>G"];
const BASES: [char; 4] = ['A', 'C', 'G', 'T'];

/// Number of SBS96 categories
pub const N_SBS96: usize = 96;

/// The 96 trinucleotide contexts in the conventional order:
/// substitution, then 5' base, then 3' base (`A[C>A]A`, `A[C>A]C`, ...)
pub fn sbs96_contexts() -> Vec<String> {
    let mut labels = Vec::with_capacity(N_SBS96);
    for substitution in SUBSTITUTIONS {
        for five_prime in BASES {
            for three_prime in BASES {
                labels.push(format!("{}[{}]{}", five_prime, substitution, three_prime));
            }
        }
    }
    labels
}

/// SBS96 labels when there are 96 categories, `c1..cN` otherwise
pub fn default_category_labels(n_categories: usize) -> Vec<String> {
    if n_categories == N_SBS96 {
        sbs96_contexts()
    } else {
        (1..=n_categories).map(|i| format!("c{}", i)).collect()
    }
}

/// Column names for de novo signatures: `Denovo A`, `Denovo B`, ...
pub fn denovo_signature_names(n_signatures: usize) -> Vec<String> {
    (0..n_signatures)
        .map(|k| {
            let mut label = String::new();
            let mut n = k;
            loop {
                label.insert(0, (b'A' + (n % 26) as u8) as char);
                if n < 26 {
                    break;
                }
                n = n / 26 - 1;
            }
            format!("Denovo {}", label)
        })
        .collect()
}
