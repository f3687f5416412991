//! Prompt templates.

/// Prompt asking the model to answer `question` from `context`.
#[must_use]
pub fn answer_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a knowledgeable AI assistant specializing in providing clear, well-structured answers.
Please answer the user's question based on the provided context information.

INSTRUCTIONS:
- Provide a comprehensive, well-organized response
- Use bullet points, numbered lists, or sections when appropriate
- Include relevant examples or details from the context
- If the context doesn't contain enough information, clearly state what you know and what you cannot determine
- Format your response to be easy to read and understand

CONTEXT INFORMATION:
{}

USER QUESTION: {}

RESPONSE:
",
        context.trim(),
        question.trim()
    )
}

/// Prompt asking the model to summarize a document.
#[must_use]
pub fn summary_prompt(filename: &str, text: &str) -> String {
    format!(
        "Please provide a comprehensive summary of the following document titled \"{filename}\":

Document Content:
{text}

Provide a clear, structured summary that includes:
1. Main topics covered
2. Key concepts and definitions
3. Important points and conclusions
4. Overall purpose or objective of the document

Summary:
"
    )
}
