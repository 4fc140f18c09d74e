// ============================================================
// Layer 4 — Demo Complaint Data
// ============================================================
// A small synthetic complaint set so the whole pipeline can be
// run without the real export. Every template is repeated
// `repeat` times with a fresh Complaint ID, which gives each
// product enough rows to be stratified.

use crate::domain::record::ComplaintRecord;

/// (product, issue, narrative)
const TEMPLATES: [(&str, &str, &str); 7] = [
    (
        "Credit card",
        "Fees or interest",
        "I was charged a late fee even though I paid on time. This is unfair.",
    ),
    (
        "Credit card",
        "Fees or interest",
        "The interest rate jumped to 25% without notice.",
    ),
    (
        "Money transfers",
        "Money was not available when promised",
        "My transfer to Kenya is stuck pending for 5 days.",
    ),
    (
        "Money transfers",
        "Fees or interest",
        "Hidden exchange rate fees are too high.",
    ),
    (
        "Savings account",
        "Problem with the interest rate",
        "The advertised APY was 2% but I only got 0.5%.",
    ),
    (
        "Personal loan",
        "Problem with the payoff process",
        "Prepayment penalty was not disclosed when I paid off my loan early.",
    ),
    (
        "Savings account",
        "Customer service",
        "The chatbot is useless, I need a human agent. Nobody at XXXX answered my calls.",
    ),
];

pub fn demo_records(repeat: usize) -> Vec<ComplaintRecord> {
    (0..repeat)
        .flat_map(|round| TEMPLATES.iter().enumerate().map(move |(i, t)| (round, i, t)))
        .map(|(round, i, &(product, issue, narrative))| {
            ComplaintRecord::new(narrative)
                .with_field("Complaint ID", (1000 + round * TEMPLATES.len() + i).to_string())
                .with_field("Product", product)
                .with_field("Issue", issue)
        })
        .collect()
}
