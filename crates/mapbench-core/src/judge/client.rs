use super::{Judge, JudgeVerdict};

pub(crate) async fn call_judge_impl(judge: &Judge, prompt: &str) -> anyhow::Result<JudgeVerdict> {
    let system = [super::prompt::SYSTEM_PROMPT.to_string()];
    let resp = judge.client.complete(prompt, Some(&system)).await?;
    parse_verdict(&resp.text)
}

pub(crate) fn parse_verdict(text: &str) -> anyhow::Result<JudgeVerdict> {
    let text = text.trim();
    let json_start_idx = text
        .find('{')
        .ok_or_else(|| anyhow::anyhow!("No JSON object found in judge output"))?;
    let json_segment = &text[json_start_idx..];

    let val: serde_json::Value = serde_json::Deserializer::from_str(json_segment)
        .into_iter::<serde_json::Value>()
        .next()
        .ok_or_else(|| anyhow::anyhow!("No JSON object found in extracted text"))?
        .map_err(|e| anyhow::anyhow!("Invalid JSON: {}", e))?;

    let score = val
        .get("score")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| anyhow::anyhow!("Judge JSON missing numeric 'score' field"))?;
    if !(0.0..=1.0).contains(&score) {
        anyhow::bail!("Judge score {} outside [0, 1]", score);
    }

    let explanation = val
        .get("explanation")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    Ok(JudgeVerdict { score, explanation })
}
