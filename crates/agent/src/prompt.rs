//! The research persona and the progress notices shown to the user.

use quranlens_core::tool::ToolName;

/// Default system prompt of the Quran research agent.
pub const SYSTEM_PROMPT: &str = r#"أنت باحث قرآني متخصص في القرآن الكريم وعلومه، تساعد الباحثين والطلاب على فهم الآيات وتفسيرها.

## الأدوات المتاحة
1. search_quran_by_keywords: البحث النصي بالكلمات المفتاحية، للكلمات والعبارات المحددة.
2. search_quran_by_meaning: البحث الدلالي بالمعنى، للأسئلة الموضوعية والمفاهيمية.
3. get_ayah_by_reference: جلب آية برقمها، مثل "2:255" لآية الكرسي.
4. get_surah_ayahs: جلب آيات سورة كاملة أو جزء منها.
5. search_tafsir: البحث في كتب التفسير.
6. get_tafsir_for_ayah: جلب تفسير آية محددة.
7. get_surah_info: معلومات السورة من اسم وعدد آيات ومكان نزول.

## الإرشادات
- استخدم الأدوات دائماً عند السؤال عن القرآن أو التفسير، ولا تنقل آية أو تفسيراً من الذاكرة.
- إذا لم تُرجع أداة نتائج فجرّب أداة أخرى أو صياغة مختلفة (مثلاً: البحث الدلالي بعد فشل البحث النصي).
- يمكنك استدعاء أكثر من أداة في الخطوة نفسها عند الحاجة.
- أجب بالعربية الفصحى وبتنسيق Markdown: عناوين وقوائم، وخط غامق للنقاط المهمة، و> للاقتباس من التفسير.
- اذكر مرجع كل آية (السورة:الآية)، وقدّم السياق عند الحاجة، وصرّح بعدم اليقين إن وُجد.
- text_type_id = 1 هو النص القرآني البسيط (الافتراضي)."#;

/// Header of the answer given when the iteration budget runs out.
pub const BUDGET_EXHAUSTED_HEADER: &str = "⚠️ بلغ الوكيل الحد الأقصى من المحاولات قبل صياغة إجابة نهائية.";

/// Body of that answer when there is nothing else to show.
pub const NOTHING_TO_SHOW: &str =
    "لم يتمكّن الوكيل من إرجاع بيانات إضافية، لكن تم تنفيذ الأدوات المطلوبة قبل التوقّف.";

/// Shown when the model's final turn is empty and nothing earlier can stand in.
pub const EMPTY_ANSWER: &str = "لم يُرجع النموذج إجابة. يُرجى إعادة صياغة السؤال.";

const UNKNOWN_TOOL_LABEL: &str = "جاري تنفيذ العملية";

/// Arabic progress label for a tool, by wire name.
pub fn tool_label(name: &str) -> &'static str {
    let Ok(tool) = name.parse::<ToolName>() else {
        return UNKNOWN_TOOL_LABEL;
    };
    match tool {
        ToolName::SearchQuranByKeywords => "جاري البحث في القرآن بالكلمات المفتاحية",
        ToolName::SearchQuranByMeaning => "جاري البحث الدلالي في القرآن",
        ToolName::GetAyahByReference => "جاري جلب الآية",
        ToolName::GetSurahAyahs => "جاري جلب آيات السورة",
        ToolName::SearchTafsir => "جاري البحث في التفسير",
        ToolName::GetTafsirForAyah => "جاري جلب تفسير الآية",
        ToolName::GetSurahInfo => "جاري جلب معلومات السورة",
    }
}

pub fn tool_started(name: &str) -> String {
    format!("\n🔍 {}...\n\n", tool_label(name))
}

pub fn tool_finished(result_count: usize) -> String {
    if result_count > 0 {
        format!("✅ تم العثور على {result_count} نتيجة\n\n")
    } else {
        "⚠️ لم يتم العثور على نتائج\n\n".to_string()
    }
}

pub const TOOL_FAILED: &str = "❌ تعذّر تنفيذ الأداة\n\n";
