/*!

This is the long-form manual for `questionnaire` and the `survey` command.

## Questionnaire layout

All the questionnaires of a survey are copies of one template workbook. Only
the first worksheet is read. With the default layout:

| Cell(s) | Content |
|---|---|
| `F1` | completion marker, set to `ok` by the respondent (any case, surrounding spaces ignored) |
| `E1` | respondent name, written when the questionnaire is distributed |
| `D4`..`D11` | question labels, read downwards until the first blank cell (or `0`) |
| row 3 from `E` | subject names, one per column, up to the last used column |
| question row x subject column | scores |

A questionnaire is skipped without notice while its marker is not `ok`. A
completed questionnaire without any question label or any subject name is
reported and skipped.

## Scores

* A filled cell is copied as is (numbers stay numbers, text is trimmed).
* A blank cell in one of the last two questions of the questionnaire is
  reported with the not-answered marker (`N/A` unless configured otherwise).
  These are usually open questions.
* Any other blank cell counts as `0`.
* A subject without a single filled cell is left out of the report.

The number of trailing questions treated as optional is `notApplicableTail`
in the layout settings.

## Report columns

`identifier`, `name`, `subject`, then one column per question position. The
header of a position is the label of the first questionnaire (in processing
order) that has one there. The report has as many question columns as the
longest questionnaire; shorter questionnaires leave the extra cells empty.

## Directory layout

```text
<root>/
  survey.json              optional configuration
  list_all.xlsx            roster: identifier, name, password, email
  questionnaire.xlsx       template
  completeness_log.csv     appended by `survey completeness`
  data/<identifier>/files/survey_<name>.xlsx
```

 */
