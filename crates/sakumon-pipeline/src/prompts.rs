//! Prompt and document templates.
//!
//! All templates are compiled once into a Handlebars registry. Escaping
//! is disabled globally: the output is prompts and LaTeX, not HTML.

use handlebars::Handlebars;
use sakumon_core::RenderingError;
use serde_json::Value;

pub const DRAFT_TEMPLATE: &str = "draft";
pub const VERIFY_TEMPLATE: &str = "verify";
pub const REVISE_TEMPLATE: &str = "revise";
pub const DOCUMENT_TEMPLATE: &str = "document";

const DRAFT_PROMPT: &str = r#"あなたは数学の問題を生成するAIアシスタントです。
以下の要件に従って高品質な数学問題と解答を生成してください：

1. 難易度に応じた適切な問題を生成してください
   - 小学生: 基本的な演算、簡単な図形
   - 中学生: 方程式、関数、平面図形
   - 高校生: 二次関数、三角関数、確率・統計、複雑な図形

2. 明確で理解しやすい問題文を作成してください

3. 詳細な解答ステップを含めてください
   - 途中の計算過程をすべて含める
   - 各ステップの論理的説明

【入力パラメータ】
難易度: {{difficulty}}
トピック: {{topic}}
形式: {{format}}
問題数: {{count}}
追加要件: {{details}}

追加要件（details）にはユーザーとの会話履歴から収集された情報が
含まれています。問題生成において最優先で考慮してください。

【出力】
以下の形式で単一のJSONオブジェクトを出力してください。
問題数が2以上の場合も、複数の問題を一つの問題文にまとめて記述し、
配列形式では返さないでください。
visualization フィールドは任意です。

{
  "id": "prob-001",
  "question": "問題文",
  "answer": "解答の最終的な答え",
  "explanation": "詳細な解答過程（途中式と考え方の説明を含む）"
}

必ず妥当なJSONを出力し、計算は正確に行ってください。"#;

const VERIFY_PROMPT: &str = r#"あなたは数学の問題の解答を検証する専門家です。
解答の数学的正確性、解法ステップの完全性、教育的価値を詳細に評価してください。

【検証対象の問題と解答】
問題ID: {{id}}
問題文: {{question}}
解答: {{answer}}
解説: {{explanation}}

【出力形式】
以下の形式でJSONを出力してください:

{
  "is_valid": boolean,
  "score": number,
  "math_accuracy": {"is_correct": boolean, "error_details": "...", "score": number},
  "solution_completeness": {"has_all_steps": boolean, "missing_steps": ["..."], "score": number},
  "educational_value": {"is_instructive": boolean, "improvement_areas": ["..."], "score": number},
  "feedback": "全体的なフィードバック",
  "suggestions": ["改善のための具体的な提案"]
}

数学的に完全に正確である場合のみis_validをtrueとしてください。
スコアは0〜100で、厳格かつ公平な評価を行ってください。"#;

const REVISE_PROMPT: &str = r#"あなたは数学の問題を修正するAIアシスタントです。
検証結果に基づいて、問題と解答を修正してください。

## 現在の問題:
ID: {{id}}
問題文: {{question}}
解答: {{answer}}
解説: {{explanation}}

## 検証結果:
フィードバック: {{feedback}}
改善点: {{suggestions}}

修正後の問題は、元の問題の意図を保ちながら、検証で指摘された
問題点を解決するようにしてください。

重要:
1. 数学的正確性を最優先してください
2. 問題の難易度を維持してください
3. 解説は十分に詳細で、教育的価値があるようにしてください

出力は以下のJSON形式に厳密に従ってください：
{
  "id": "問題のID",
  "question": "修正後の問題文",
  "answer": "修正後の解答",
  "explanation": "修正後の解説"
}"#;

const DOCUMENT: &str = r#"\documentclass[a4paper,11pt]{article}
\usepackage[utf8]{inputenc}
\usepackage{amsmath,amssymb}
\usepackage{float}
\usepackage{tikz}
\usepackage{pgfplots}
\usepgfplotslibrary{fillbetween}
\pgfplotsset{compat=1.18}

\begin{document}

\section*{問題}
{{PROBLEM_TEXT}}

{{FIGURE_CODE}}

\section*{解答}
{{ANSWER_TEXT}}

\section*{解説}
{{EXPLANATION_TEXT}}

\end{document}
"#;

/// Compiled registry for all pipeline templates.
pub struct PromptRenderer {
    handlebars: Handlebars<'static>,
}

impl PromptRenderer {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(handlebars::no_escape);
        // Static templates cannot fail to compile; a broken one is a bug
        // caught by the tests below.
        let _ = handlebars.register_template_string(DRAFT_TEMPLATE, DRAFT_PROMPT);
        let _ = handlebars.register_template_string(VERIFY_TEMPLATE, VERIFY_PROMPT);
        let _ = handlebars.register_template_string(REVISE_TEMPLATE, REVISE_PROMPT);
        let _ = handlebars.register_template_string(DOCUMENT_TEMPLATE, DOCUMENT);
        Self { handlebars }
    }

    pub fn render(&self, name: &str, data: &Value) -> Result<String, RenderingError> {
        self.handlebars
            .render(name, data)
            .map_err(|e| RenderingError(format!("template {name}: {e}")))
    }
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}
