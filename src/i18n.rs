//! Display strings for the chat UI, keyed by language and message key.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ja,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::Ja];

    /// Unrecognized codes fall back to English.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "ja" => Language::Ja,
            _ => Language::En,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ja => "ja",
        }
    }

    /// Label shown in the language selector.
    pub fn label(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Ja => "日本語",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    PageTitle,
    MainTitle,
    Subtitle,
    Language,
    Model,
    SidebarHeader,
    ChooseFile,
    Processing,
    UploadSuccess,
    UploadRejected,
    CurrentPdf,
    ClearButton,
    Cleared,
    AboutHeader,
    AboutText,
    UploadPrompt,
    ChatInput,
    Thinking,
    ViewSources,
    ErrorResponse,
    Footer,
    ErrorApiKey,
    ErrorSaveFile,
    ErrorCreateStore,
    ErrorUploadStore,
    ErrorQuery,
    ErrorCleanup,
    NotPdf,
    SessionExpired,
    RequestFailed,
}

impl MessageKey {
    pub const ALL: [MessageKey; 30] = [
        MessageKey::PageTitle,
        MessageKey::MainTitle,
        MessageKey::Subtitle,
        MessageKey::Language,
        MessageKey::Model,
        MessageKey::SidebarHeader,
        MessageKey::ChooseFile,
        MessageKey::Processing,
        MessageKey::UploadSuccess,
        MessageKey::UploadRejected,
        MessageKey::CurrentPdf,
        MessageKey::ClearButton,
        MessageKey::Cleared,
        MessageKey::AboutHeader,
        MessageKey::AboutText,
        MessageKey::UploadPrompt,
        MessageKey::ChatInput,
        MessageKey::Thinking,
        MessageKey::ViewSources,
        MessageKey::ErrorResponse,
        MessageKey::Footer,
        MessageKey::ErrorApiKey,
        MessageKey::ErrorSaveFile,
        MessageKey::ErrorCreateStore,
        MessageKey::ErrorUploadStore,
        MessageKey::ErrorQuery,
        MessageKey::ErrorCleanup,
        MessageKey::NotPdf,
        MessageKey::SessionExpired,
        MessageKey::RequestFailed,
    ];

    /// Stable identifier used by the web page to look up labels.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKey::PageTitle => "page_title",
            MessageKey::MainTitle => "main_title",
            MessageKey::Subtitle => "subtitle",
            MessageKey::Language => "language",
            MessageKey::Model => "model",
            MessageKey::SidebarHeader => "sidebar_header",
            MessageKey::ChooseFile => "choose_file",
            MessageKey::Processing => "processing",
            MessageKey::UploadSuccess => "upload_success",
            MessageKey::UploadRejected => "upload_rejected",
            MessageKey::CurrentPdf => "current_pdf",
            MessageKey::ClearButton => "clear_button",
            MessageKey::Cleared => "cleared",
            MessageKey::AboutHeader => "about_header",
            MessageKey::AboutText => "about_text",
            MessageKey::UploadPrompt => "upload_prompt",
            MessageKey::ChatInput => "chat_input",
            MessageKey::Thinking => "thinking",
            MessageKey::ViewSources => "view_sources",
            MessageKey::ErrorResponse => "error_response",
            MessageKey::Footer => "footer",
            MessageKey::ErrorApiKey => "error_api_key",
            MessageKey::ErrorSaveFile => "error_save_file",
            MessageKey::ErrorCreateStore => "error_create_store",
            MessageKey::ErrorUploadStore => "error_upload_store",
            MessageKey::ErrorQuery => "error_query",
            MessageKey::ErrorCleanup => "error_cleanup",
            MessageKey::NotPdf => "not_pdf",
            MessageKey::SessionExpired => "session_expired",
            MessageKey::RequestFailed => "request_failed",
        }
    }
}

pub fn localize(key: MessageKey, lang: Language) -> &'static str {
    match lang {
        Language::En => english(key),
        Language::Ja => japanese(key),
    }
}

/// Fills the single `{}` placeholder of a template message.
pub fn localize_with(key: MessageKey, lang: Language, arg: &str) -> String {
    localize(key, lang).replacen("{}", arg, 1)
}

fn english(key: MessageKey) -> &'static str {
    match key {
        MessageKey::PageTitle => "PDF Chat with Gemini",
        MessageKey::MainTitle => "📄 PDF Chat with Gemini",
        MessageKey::Subtitle => {
            "Upload a PDF and ask questions about its content using Google's Gemini AI"
        }
        MessageKey::Language => "Language",
        MessageKey::Model => "Model",
        MessageKey::SidebarHeader => "PDF Upload",
        MessageKey::ChooseFile => "Choose a PDF file",
        MessageKey::Processing => "Processing PDF...",
        MessageKey::UploadSuccess => "✅ Successfully uploaded: {}",
        MessageKey::UploadRejected => "Clear the current PDF before uploading another one.",
        MessageKey::CurrentPdf => "📄 Current PDF: {}",
        MessageKey::ClearButton => "🗑️ Clear PDF and Start Over",
        MessageKey::Cleared => "Cleared. Upload a new PDF to continue.",
        MessageKey::AboutHeader => "About",
        MessageKey::AboutText => {
            "This app uses Google's Gemini AI with File Search to answer questions about your PDF documents."
        }
        MessageKey::UploadPrompt => "👈 Please upload a PDF file to start chatting",
        MessageKey::ChatInput => "Ask a question about your PDF...",
        MessageKey::Thinking => "Thinking...",
        MessageKey::ViewSources => "📚 View Sources",
        MessageKey::ErrorResponse => "Sorry, I couldn't generate a response. Please try again.",
        MessageKey::Footer => "Built with Rust and Google Gemini API",
        MessageKey::ErrorApiKey => "GEMINI_API_KEY environment variable not set.",
        MessageKey::ErrorSaveFile => "Error saving file: {}",
        MessageKey::ErrorCreateStore => "Error creating file search store: {}",
        MessageKey::ErrorUploadStore => "Error uploading file to store: {}",
        MessageKey::ErrorQuery => "Error querying file search: {}",
        MessageKey::ErrorCleanup => "Error cleaning up store: {}",
        MessageKey::NotPdf => "Only PDF files can be uploaded.",
        MessageKey::SessionExpired => "Your session has ended. A new one has been started.",
        MessageKey::RequestFailed => "Request failed: {}",
    }
}

fn japanese(key: MessageKey) -> &'static str {
    match key {
        MessageKey::PageTitle => "Gemini PDF チャット",
        MessageKey::MainTitle => "📄 Gemini PDF チャット",
        MessageKey::Subtitle => {
            "PDFをアップロードして、Google Gemini AIを使って内容について質問できます"
        }
        MessageKey::Language => "言語",
        MessageKey::Model => "モデル",
        MessageKey::SidebarHeader => "PDFアップロード",
        MessageKey::ChooseFile => "PDFファイルを選択",
        MessageKey::Processing => "PDFを処理中...",
        MessageKey::UploadSuccess => "✅ アップロード成功: {}",
        MessageKey::UploadRejected => {
            "別のPDFをアップロードする前に、現在のPDFをクリアしてください。"
        }
        MessageKey::CurrentPdf => "📄 現在のPDF: {}",
        MessageKey::ClearButton => "🗑️ PDFをクリアして最初から",
        MessageKey::Cleared => "クリアしました。新しいPDFをアップロードしてください。",
        MessageKey::AboutHeader => "概要",
        MessageKey::AboutText => {
            "このアプリは、Google Gemini AIのFile Search機能を使用して、PDFドキュメントに関する質問に回答します。"
        }
        MessageKey::UploadPrompt => {
            "👈 チャットを開始するにはPDFファイルをアップロードしてください"
        }
        MessageKey::ChatInput => "PDFについて質問してください...",
        MessageKey::Thinking => "考え中...",
        MessageKey::ViewSources => "📚 ソースを表示",
        MessageKey::ErrorResponse => {
            "申し訳ございません。応答を生成できませんでした。もう一度お試しください。"
        }
        MessageKey::Footer => "Rust と Google Gemini API で構築",
        MessageKey::ErrorApiKey => "GEMINI_API_KEY環境変数が設定されていません。",
        MessageKey::ErrorSaveFile => "ファイル保存中にエラー: {}",
        MessageKey::ErrorCreateStore => "ファイル検索ストア作成中にエラー: {}",
        MessageKey::ErrorUploadStore => "ストアへのファイルアップロード中にエラー: {}",
        MessageKey::ErrorQuery => "ファイル検索クエリ中にエラー: {}",
        MessageKey::ErrorCleanup => "ストアのクリーンアップ中にエラー: {}",
        MessageKey::NotPdf => "アップロードできるのはPDFファイルのみです。",
        MessageKey::SessionExpired => "セッションが終了したため、新しいセッションを開始しました。",
        MessageKey::RequestFailed => "リクエストに失敗しました: {}",
    }
}

/// Whole table for one language, in `MessageKey::ALL` order.
pub fn table(lang: Language) -> Vec<(&'static str, &'static str)> {
    MessageKey::ALL
        .iter()
        .map(|&key| (key.as_str(), localize(key, lang)))
        .collect()
}
