/// Freight suppliers recognised from an uploaded file name, in match order.
const KNOWN_SUPPLIERS: [&str; 8] = [
    "test", "bring", "ups", "dhl", "postnord", "fedex", "schenker", "ntg",
];

/// Guesses the supplier an invoice or price list belongs to from its file name.
pub fn detect_supplier(filename: &str) -> Option<&'static str> {
    let lower = filename.to_lowercase();
    KNOWN_SUPPLIERS
        .into_iter()
        .find(|supplier| lower.contains(supplier))
}
