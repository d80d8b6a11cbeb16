use serde::Serialize;
use serde_json::Value;

/// Prompt for the data-pack analysis of one or more tickers.
///
/// `records` are Final_Insight rows: grade and alpha per ETF plus the
/// `macro_json` and `sentiment_json` context columns.
pub fn deep_analysis_prompt<T: Serialize>(records: &[T]) -> String {
    let pack = serde_json::to_string(records).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"당신은 개인 투자자의 수석 퀀트 애널리스트입니다.
아래는 분석 대상 종목들에 대한 [통합 데이터팩]입니다.
이 데이터에는 각 종목의 퀀트 점수(A), 최신 시장 매크로(C), 시장 심리(E) 정보가 모두 포함되어 있습니다.

[데이터 분석 팩]
{}

[지시사항]
1. 각 종목별로 '등급'과 'Alpha' 수치를 언급하며 현재 위치를 진단하세요.
2. 'macro_json'에 담긴 시장 상황(나스닥, 환율 등)이 이 종목들에게 어떤 영향을 줄지 설명하세요.
3. 'sentiment_json'의 지표를 활용하여 지금이 공격적으로 매수할 때인지, 관망할 때인지 결론을 내주세요.
4. 추천 종목은 반드시 '종목명(6자리코드)' 형식으로 3개 포함하세요.
5. '데이터 없음'이라는 말은 절대 하지 말고, 제공된 통합 정보를 바탕으로 가장 전문적인 전략을 제시하세요."#,
        pack
    )
}

/// Prompt for the single-ETF strategy report shown in the dashboard modal.
pub fn strategy_prompt(stock_info: &Value) -> String {
    let field = |key: &str| match stock_info.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    };

    format!(
        r#"당신은 한국 ETF 시장을 분석하는 퀀트 전략가입니다.
다음 ETF의 퀀트 성적표를 바탕으로 매매 전략 리포트를 작성하세요.

- 종목: {}({})
- 등급/점수: {}
- 1개월 Alpha(KOSPI 200 대비): {}%
- 상대 거래량(RVOL): {}%
- 진단: {}

[작성 규칙]
1. 등급 의미(S: 주도주, A: 급부상, B: 눌림목)를 기준으로 현재 국면을 한 문단으로 요약하세요.
2. 진입 구간, 손절 기준, 목표 수익 구간을 구체적인 조건으로 제시하세요.
3. 거래량과 추세 관점의 위험 요인을 두 가지 이상 짚어 주세요.
4. 마지막 줄에 '매수 / 관망 / 회피' 중 하나로 결론을 내리세요."#,
        field("name"),
        field("ticker"),
        field("grade_score"),
        field("alpha_1m"),
        field("rvol"),
        field("description"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_analysis_embeds_records_without_escaping_korean() {
        let records = vec![json!({ "ticker": "069500", "name": "KODEX 200", "grade_score": "S7" })];
        let prompt = deep_analysis_prompt(&records);
        assert!(prompt.contains(r#""name":"KODEX 200""#));
        assert!(prompt.contains("6자리코드"));
    }

    #[test]
    fn strategy_prompt_fills_missing_fields() {
        let prompt = strategy_prompt(&json!({ "ticker": "069500", "name": "KODEX 200", "alpha_1m": 3.5 }));
        assert!(prompt.contains("KODEX 200(069500)"));
        assert!(prompt.contains("1개월 Alpha(KOSPI 200 대비): 3.5%"));
        assert!(prompt.contains("등급/점수: -"));
    }
}
