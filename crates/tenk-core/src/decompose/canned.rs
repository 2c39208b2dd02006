const APPLE_GOOGLE: [&str; 10] = [
    "What is Apple's total revenue for the most recent fiscal year?",
    "What is Google's total revenue for the most recent fiscal year?",
    "What is Apple's net income margin?",
    "What is Google's net income margin?",
    "What is Apple's research and development spending?",
    "What is Google's research and development spending?",
    "What is Apple's market capitalization?",
    "What is Google's market capitalization?",
    "What is Apple's debt-to-equity ratio?",
    "What is Google's debt-to-equity ratio?",
];

const GENERIC: [&str; 10] = [
    "What is the company's total revenue?",
    "What is the company's net income?",
    "What is the company's profit margin?",
    "What is the company's revenue growth rate?",
    "What is the company's research and development spending?",
    "What is the company's market capitalization?",
    "What is the company's debt-to-equity ratio?",
    "What is the company's return on equity?",
    "What is the company's current ratio?",
    "What is the company's earnings per share?",
];

/// Offline question set used when the decomposition call fails.
///
/// A question naming both Apple and Google gets the paired comparison set;
/// anything else gets generic single-company questions.
#[must_use]
pub fn canned_questions(question: &str) -> Vec<String> {
    let lower = question.to_lowercase();
    let set = if lower.contains("apple") && lower.contains("google") {
        &APPLE_GOOGLE
    } else {
        &GENERIC
    };
    set.iter().map(|q| (*q).to_owned()).collect()
}
