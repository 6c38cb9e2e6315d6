//! Tool definitions advertised to the model.

use quranlens_core::provider::ToolDefinition;
use quranlens_core::tool::ToolName;
use serde_json::{Value, json};

const AYAH_KEY_DESCRIPTION: &str = "مرجع الآية بصيغة \"رقم_السورة:رقم_الآية\" (مثال: \"2:255\")";
const TEXT_TYPE_DESCRIPTION: &str = "معرف نوع النص القرآني (1 = النص البسيط، افتراضي)";
const SURAH_NUMBER_DESCRIPTION: &str = "رقم السورة (1-114)";

/// The JSON-schema definition of `tool`.
pub fn definition(tool: ToolName) -> ToolDefinition {
    let (description, parameters) = match tool {
        ToolName::SearchQuranByKeywords => (
            "البحث في القرآن الكريم بالكلمات المفتاحية باستخدام التشابه النصي للعثور على الآيات التي تحتوي على الكلمات المطلوبة أو ما يقاربها.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "الكلمات المفتاحية للبحث (يفضل النص العربي دون تشكيل)"
                    },
                    "text_type_id": text_type_property(),
                    "limit": {
                        "type": "integer",
                        "description": "عدد النتائج (افتراضي: 10، أقصى: 50)",
                        "default": 10
                    }
                },
                "required": ["query"]
            }),
        ),
        ToolName::SearchQuranByMeaning => (
            "البحث الدلالي في القرآن الكريم بالمعنى للعثور على آيات متقاربة المعنى حتى لو اختلفت ألفاظها.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "السؤال أو الموضوع المراد البحث عن آيات في معناه"
                    },
                    "text_type_id": text_type_property(),
                    "limit": {
                        "type": "integer",
                        "description": "عدد النتائج (افتراضي: 10، أقصى: 30)",
                        "default": 10
                    },
                    "similarity_threshold": {
                        "type": "number",
                        "description": "الحد الأدنى للتشابه بين 0.0 و 1.0 (افتراضي: 0.7)",
                        "default": 0.7
                    }
                },
                "required": ["query"]
            }),
        ),
        ToolName::GetAyahByReference => (
            "جلب آية محددة بمرجعها (رقم السورة:رقم الآية)، مثل \"2:255\" لآية الكرسي.",
            json!({
                "type": "object",
                "properties": {
                    "ayah_key": { "type": "string", "description": AYAH_KEY_DESCRIPTION },
                    "text_type_id": text_type_property()
                },
                "required": ["ayah_key"]
            }),
        ),
        ToolName::GetSurahAyahs => (
            "جلب آيات سورة كاملة أو أول عدد منها.",
            json!({
                "type": "object",
                "properties": {
                    "surah_number": { "type": "integer", "description": SURAH_NUMBER_DESCRIPTION },
                    "text_type_id": text_type_property(),
                    "limit": {
                        "type": "integer",
                        "description": "عدد الآيات (اختياري، الافتراضي جميع الآيات)"
                    }
                },
                "required": ["surah_number"]
            }),
        ),
        ToolName::SearchTafsir => (
            "البحث في كتب التفسير بالكلمات المفتاحية.",
            json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "الكلمات المفتاحية للبحث في التفسير" },
                    "edition_id": { "type": "integer", "description": "معرف نسخة التفسير (اختياري)" },
                    "limit": {
                        "type": "integer",
                        "description": "عدد النتائج (افتراضي: 10، أقصى: 50)",
                        "default": 10
                    }
                },
                "required": ["query"]
            }),
        ),
        ToolName::GetTafsirForAyah => (
            "جلب تفسير آية محددة.",
            json!({
                "type": "object",
                "properties": {
                    "ayah_key": { "type": "string", "description": AYAH_KEY_DESCRIPTION },
                    "edition_id": { "type": "integer", "description": "معرف نسخة التفسير (اختياري)" }
                },
                "required": ["ayah_key"]
            }),
        ),
        ToolName::GetSurahInfo => (
            "جلب معلومات سورة: الاسم وعدد الآيات ومكان النزول والصفحات.",
            json!({
                "type": "object",
                "properties": {
                    "surah_number": { "type": "integer", "description": SURAH_NUMBER_DESCRIPTION }
                },
                "required": ["surah_number"]
            }),
        ),
    };

    ToolDefinition {
        name: tool.as_str().to_string(),
        description: description.to_string(),
        parameters,
    }
}

/// Definitions for the whole catalog, in [`ToolName::ALL`] order.
pub fn definitions() -> Vec<ToolDefinition> {
    ToolName::ALL.into_iter().map(definition).collect()
}

fn text_type_property() -> Value {
    json!({
        "type": "integer",
        "description": TEXT_TYPE_DESCRIPTION,
        "default": 1
    })
}
