pub(crate) const SYSTEM_PROMPT: &str =
    "You are a fair and accurate evaluator of map interpretation answers.";

pub(crate) fn build_prompt_impl(question: &str, expected: &str, produced: &str) -> String {
    format!(
        "You are evaluating a model's answer to a map interpretation question.\n\n\
         Question: {question}\n\
         Expected Answer: {expected}\n\
         Model's Answer: {produced}\n\n\
         Score the model's answer on a scale from 0.0 to 1.0 based on:\n\
         1. Factual accuracy compared to the expected answer\n\
         2. Completeness of the response\n\
         3. Relevance to the question\n\n\
         Provide your response in JSON format:\n\
         {{\n    \"score\": <float between 0.0 and 1.0>,\n    \"explanation\": \"<brief explanation of the score>\"\n}}"
    )
}
